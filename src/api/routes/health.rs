//! Liveness endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::api::server::AppState;

/// GET /health
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let engine = state.engine();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "entries": engine.len(),
        "capacity": engine.capacity(),
    }))
}
