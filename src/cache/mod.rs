//! Intent-aware response cache with TTL and LRU eviction.
//!
//! Prompts are normalized, looked up exactly, then (when short and plain
//! enough) mapped to an intent key so that rephrasings can share an entry.
//! All state lives in memory behind [`CacheEngine`].

pub mod clock;
pub mod decision;
pub mod engine;
pub mod events;
pub mod intent;
pub mod metrics;
pub mod normalize;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use decision::{classify_risk, Decision, HitKind, Risk};
pub use engine::{CacheEngine, CacheEngineBuilder, DEFAULT_MAX_ENTRIES};
pub use events::{CacheEvent, EventSink, EvictReason, MemorySink, NoopSink, TracingSink};
pub use intent::{extract_intent, IntentGuard, IntentMatch};
pub use metrics::{CacheMetrics, MetricsSnapshot};
pub use normalize::normalize_prompt;
pub use store::{CacheEntry, EntryId, EntryStore};
