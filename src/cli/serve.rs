//! `evicta serve`

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use evicta::api::{start_server, AppState};
use evicta::backend::OllamaBackend;
use evicta::cache::{CacheEngine, TracingSink};
use evicta::config::Config;
use evicta::policy::FixedTtl;
use evicta::service::CacheService;

pub(crate) async fn cmd_serve(config: Config) -> Result<()> {
    let engine = Arc::new(
        CacheEngine::builder()
            .config(&config.cache, &config.intent)
            .events(Arc::new(TracingSink))
            .build(),
    );
    let backend = OllamaBackend::new(&config.backend).context("failed to create backend client")?;
    info!(
        backend_url = %config.backend.url,
        model = %config.backend.model,
        max_entries = engine.capacity(),
        default_ttl_secs = config.cache.default_ttl_secs,
        intent_enabled = config.intent.enabled,
        "Starting evicta"
    );

    let service = CacheService::new(
        Arc::clone(&engine),
        Arc::new(backend),
        Arc::new(FixedTtl::new(config.cache.default_ttl_secs)),
    );
    let state = AppState::new(Arc::new(service));

    tokio::select! {
        result = start_server(&config.server, state) => {
            result.context("server stopped")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
        }
    }

    engine.emit_metrics_summary("shutdown");
    Ok(())
}
