//! POST /ask

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use tracing::warn;

use crate::api::server::AppState;
use crate::error::EvictaError;
use crate::service::{AskOutcome, AskRequest};

pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskOutcome>, (StatusCode, Json<Value>)> {
    if req.prompt.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "prompt must not be empty" })),
        ));
    }

    match state.service.ask(&req.prompt).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => {
            warn!(error = %e, "Ask failed");
            let status = match e {
                EvictaError::Backend(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Err((status, Json(json!({ "error": e.to_string() }))))
        }
    }
}
