//! Request-level ask flow: consult the cache, fall back to the backend,
//! remember the answer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::Backend;
use crate::cache::{normalize_prompt, CacheEngine, CacheEvent, Decision, HitKind, Risk};
use crate::error::Result;
use crate::policy::TtlPolicy;

/// Body of an ask request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub prompt: String,
}

/// Result of [`CacheService::ask`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AskOutcome {
    pub answer: String,
    pub cache_hit: bool,
    pub hit_type: HitKind,
    pub risk: Risk,
}

/// Glues the cache engine to a generative backend and a TTL policy.
pub struct CacheService {
    engine: Arc<CacheEngine>,
    backend: Arc<dyn Backend>,
    policy: Arc<dyn TtlPolicy>,
}

impl CacheService {
    pub fn new(engine: Arc<CacheEngine>, backend: Arc<dyn Backend>, policy: Arc<dyn TtlPolicy>) -> Self {
        Self {
            engine,
            backend,
            policy,
        }
    }

    pub fn engine(&self) -> &Arc<CacheEngine> {
        &self.engine
    }

    /// Answer a prompt, from cache when possible.
    ///
    /// Backend failures propagate and leave the cache untouched.
    pub async fn ask(&self, prompt: &str) -> Result<AskOutcome> {
        let prompt = prompt.trim();
        let decision = self.engine.decide(prompt);
        self.report(prompt, &decision);

        if let Some(entry_id) = decision.entry_id() {
            match self.engine.response(entry_id) {
                Some(answer) => {
                    return Ok(AskOutcome {
                        answer,
                        cache_hit: true,
                        hit_type: decision.kind(),
                        risk: decision.risk(),
                    });
                }
                None => warn!(entry_id, "Entry vanished between decision and read, regenerating"),
            }
        }

        let answer = self.backend.generate(prompt).await?;
        let ttl_secs = self.policy.ttl_secs(prompt);
        let entry_id = self.engine.record_response(prompt, &answer, ttl_secs);
        debug!(entry_id = %entry_id, ttl_secs, "Stored fresh response");

        Ok(AskOutcome {
            answer,
            cache_hit: false,
            hit_type: HitKind::Miss,
            risk: Risk::High,
        })
    }

    fn report(&self, prompt: &str, decision: &Decision) {
        self.engine.emit(CacheEvent::Decision {
            hit_type: decision.kind(),
            entry_id: decision.entry_id().map(str::to_string),
            prompt: normalize_prompt(prompt),
            confidence: decision.confidence(),
            ttl_remaining: round2(decision.ttl_remaining()),
            risk: decision.risk(),
        });
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
