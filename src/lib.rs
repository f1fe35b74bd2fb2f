//! Evicta: an intent-aware response cache for LLM backends.
//!
//! The core lives in [`cache`]: prompts are normalized, looked up exactly,
//! and when that misses, mapped through a rule-based intent extractor so that
//! rephrasings of the same question share one stored answer. Entries expire
//! lazily and the least-recently-used entry is evicted at capacity.
//!
//! [`service::CacheService`] wraps the engine with a generative [`backend`]
//! and a TTL [`policy`]; the optional `server` feature exposes it over HTTP.

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod policy;
pub mod service;

#[cfg(feature = "server")]
pub mod api;

pub use cache::{CacheEngine, Decision, HitKind, Risk};
pub use config::Config;
pub use error::{EvictaError, Result};
pub use service::{AskOutcome, CacheService};
