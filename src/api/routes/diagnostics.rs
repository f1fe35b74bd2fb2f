//! Read-only views of cache state.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::api::server::AppState;

/// GET /showcache: entries in LRU order.
pub async fn show_cache(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(state.engine().dump_entries())
}

/// GET /showprompts
pub async fn show_prompts(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(state.engine().dump_prompt_index())
}

/// GET /showintents
pub async fn show_intents(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(state.engine().dump_intent_index())
}

/// GET /stats: counters plus derived hit rate.
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<Value> {
    let engine = state.engine();
    let snapshot = engine.metrics();
    Json(json!({
        "metrics": snapshot,
        "hit_rate": snapshot.hit_rate(),
        "entries": engine.len(),
        "capacity": engine.capacity(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::server::build_router;
    use crate::api::server::tests::test_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn get(app: &axum::Router, uri: &str) -> Value {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_dumps_reflect_writes() {
        let state = test_state();
        state.service.ask("what is recursion").await.unwrap();
        state.service.ask("define recursion").await.unwrap();
        let app = build_router(state);

        let cache = get(&app, "/showcache").await;
        assert_eq!(cache["count"], 1);
        let entry_id = cache["entries"][0]["id"].as_str().unwrap().to_string();
        assert_eq!(cache["entries"][0]["response"], "generated: what is recursion");

        let prompts = get(&app, "/showprompts").await;
        assert_eq!(prompts["prompt_to_entry_id"]["what is recursion"], entry_id.as_str());
        assert_eq!(prompts["prompt_to_entry_id"]["define recursion"], entry_id.as_str());

        let intents = get(&app, "/showintents").await;
        assert_eq!(
            intents["intent_to_entry_id"]["DefineConcept:recursion"],
            entry_id.as_str()
        );
        assert_eq!(
            intents["entry_id_to_intents"][entry_id.as_str()],
            json!(["DefineConcept:recursion"])
        );
    }

    #[tokio::test]
    async fn test_stats_counts_decisions() {
        let state = test_state();
        state.service.ask("hello").await.unwrap();
        state.service.ask("hello").await.unwrap();
        let app = build_router(state);

        let stats = get(&app, "/stats").await;
        assert_eq!(stats["metrics"]["total_decisions"], 2);
        assert_eq!(stats["metrics"]["exact_hits"], 1);
        assert_eq!(stats["metrics"]["cache_misses"], 1);
        assert_eq!(stats["metrics"]["cache_writes"], 1);
        assert_eq!(stats["hit_rate"], 0.5);
        assert_eq!(stats["entries"], 1);
    }

    #[tokio::test]
    async fn test_health_route() {
        let app = build_router(test_state());
        assert_eq!(get(&app, "/health").await["status"], "ok");
    }
}
