//! Lock-free cache counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::info;

use super::decision::HitKind;

/// Running totals for decisions, writes and evictions.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    total_decisions: AtomicU64,
    exact_hits: AtomicU64,
    intent_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_expired: AtomicU64,
    cache_evicted: AtomicU64,
    cache_writes: AtomicU64,
}

/// Point-in-time copy of [`CacheMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub total_decisions: u64,
    pub exact_hits: u64,
    pub intent_hits: u64,
    pub cache_misses: u64,
    pub cache_expired: u64,
    pub cache_evicted: u64,
    pub cache_writes: u64,
}

impl MetricsSnapshot {
    /// Fraction of decisions served from cache, 0.0 before any decision.
    pub fn hit_rate(&self) -> f64 {
        if self.total_decisions == 0 {
            return 0.0;
        }
        (self.exact_hits + self.intent_hits) as f64 / self.total_decisions as f64
    }
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_decision(&self, kind: HitKind) {
        self.total_decisions.fetch_add(1, Ordering::Relaxed);
        let counter = match kind {
            HitKind::Exact => &self.exact_hits,
            HitKind::Intent => &self.intent_hits,
            HitKind::Miss => &self.cache_misses,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expired(&self) {
        self.cache_expired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evicted(&self, count: u64) {
        self.cache_evicted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.cache_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_decisions: self.total_decisions.load(Ordering::Relaxed),
            exact_hits: self.exact_hits.load(Ordering::Relaxed),
            intent_hits: self.intent_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_expired: self.cache_expired.load(Ordering::Relaxed),
            cache_evicted: self.cache_evicted.load(Ordering::Relaxed),
            cache_writes: self.cache_writes.load(Ordering::Relaxed),
        }
    }

    /// Emit current counters as a structured log line.
    pub fn emit_summary(&self, reason: &str) {
        let s = self.snapshot();
        info!(
            event = "cache_summary",
            reason = reason,
            total_decisions = s.total_decisions,
            exact_hits = s.exact_hits,
            intent_hits = s.intent_hits,
            cache_misses = s.cache_misses,
            cache_expired = s.cache_expired,
            cache_evicted = s.cache_evicted,
            cache_writes = s.cache_writes,
            "Cache metrics"
        );
    }
}
