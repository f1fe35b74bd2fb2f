//! Axum HTTP front door for the cache.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::cache::CacheEngine;
use crate::config::ServerConfig;
use crate::error::{EvictaError, Result};
use crate::service::CacheService;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CacheService>,
}

impl AppState {
    pub fn new(service: Arc<CacheService>) -> Self {
        Self { service }
    }

    pub fn engine(&self) -> &CacheEngine {
        self.service.engine()
    }
}

/// Build the router with every route.
pub fn build_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/ask", post(super::routes::ask::ask))
        .route("/health", get(super::routes::health::get_health))
        // Diagnostics
        .route("/showcache", get(super::routes::diagnostics::show_cache))
        .route("/showprompts", get(super::routes::diagnostics::show_prompts))
        .route("/showintents", get(super::routes::diagnostics::show_intents))
        .route("/stats", get(super::routes::diagnostics::stats))
        // Body size limit: 64 KiB, far above any prompt the cache would keep.
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state)
}

/// Bind and serve until the process is stopped.
pub async fn start_server(config: &ServerConfig, state: AppState) -> Result<()> {
    let app = build_router(state);
    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| EvictaError::Server(format!("failed to bind {addr}: {e}")))?;
    tracing::info!("Evicta listening on {addr}");
    axum::serve(listener, app)
        .await
        .map_err(|e| EvictaError::Server(e.to_string()))?;
    Ok(())
}
