//! Structured cache events.
//!
//! The engine reports writes, expiry discoveries, evictions and decisions to
//! an [`EventSink`]. Sinks are purely observational: the engine behaves the
//! same with [`NoopSink`] as with any other sink.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use super::decision::{HitKind, Risk};

/// Why an entry was evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictReason {
    /// The store grew past capacity and this was the least-recently-used entry.
    Capacity,
    /// A write found its prompt pointing at an expired entry.
    Expired,
}

/// Events emitted by the cache engine and the request layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum CacheEvent {
    /// An entry was created or refreshed.
    #[serde(rename = "CACHE_WRITE")]
    Write {
        entry_id: String,
        prompt: String,
        ttl_seconds: u64,
        update: bool,
    },
    /// A lookup found an expired entry and purged it.
    #[serde(rename = "CACHE_EXPIRE")]
    Expire {
        entry_id: String,
        expired_at: DateTime<Utc>,
        observed_at: DateTime<Utc>,
    },
    /// An entry was removed outside the lookup path.
    #[serde(rename = "CACHE_EVICT")]
    Evict {
        entry_id: String,
        reason: EvictReason,
        prompts: Vec<String>,
        intents: Vec<String>,
    },
    /// Final decision for a request.
    #[serde(rename = "CACHE_DECISION")]
    Decision {
        hit_type: HitKind,
        entry_id: Option<String>,
        prompt: String,
        confidence: f64,
        ttl_remaining: f64,
        risk: Risk,
    },
}

impl CacheEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            CacheEvent::Write { .. } => "CACHE_WRITE",
            CacheEvent::Expire { .. } => "CACHE_EXPIRE",
            CacheEvent::Evict { .. } => "CACHE_EVICT",
            CacheEvent::Decision { .. } => "CACHE_DECISION",
        }
    }

    /// Event fields as a JSON object, without the event type.
    pub fn payload(&self) -> Value {
        match self {
            CacheEvent::Write {
                entry_id,
                prompt,
                ttl_seconds,
                update,
            } => json!({
                "entry_id": entry_id,
                "prompt": prompt,
                "ttl_seconds": ttl_seconds,
                "update": update,
            }),
            CacheEvent::Expire {
                entry_id,
                expired_at,
                observed_at,
            } => json!({
                "entry_id": entry_id,
                "expired_at": expired_at.to_rfc3339(),
                "observed_at": observed_at.to_rfc3339(),
            }),
            CacheEvent::Evict {
                entry_id,
                reason,
                prompts,
                intents,
            } => json!({
                "entry_id": entry_id,
                "reason": reason,
                "prompts": prompts,
                "intents": intents,
            }),
            CacheEvent::Decision {
                hit_type,
                entry_id,
                prompt,
                confidence,
                ttl_remaining,
                risk,
            } => json!({
                "hit_type": hit_type.as_str(),
                "entry_id": entry_id,
                "prompt": prompt,
                "confidence": confidence,
                "ttl_remaining": ttl_remaining,
                "risk": risk.as_str(),
            }),
        }
    }
}

/// Receiver of cache events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &CacheEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn emit(&self, _event: &CacheEvent) {}
}

/// Writes each event as a structured `tracing` record under the
/// `evicta::events` target, tagged with a short request id.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &CacheEvent) {
        let request_id = uuid::Uuid::new_v4().simple().to_string();
        info!(
            target: "evicta::events",
            request_id = &request_id[..8],
            event = event.event_type(),
            timestamp = %Utc::now().to_rfc3339(),
            payload = %event.payload(),
            "cache event"
        );
    }
}

/// Keeps every event in memory. Used by the probe command and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<CacheEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all recorded events, leaving the sink empty.
    pub fn drain(&self) -> Vec<CacheEvent> {
        std::mem::take(&mut *self.events.lock().expect("event sink lock poisoned"))
    }

    pub fn event_types(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .expect("event sink lock poisoned")
            .iter()
            .map(CacheEvent::event_type)
            .collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &CacheEvent) {
        self.events
            .lock()
            .expect("event sink lock poisoned")
            .push(event.clone());
    }
}
