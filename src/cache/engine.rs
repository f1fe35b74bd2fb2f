//! Cache decision engine.
//!
//! `CacheEngine` owns the [`EntryStore`] behind a single mutex and runs every
//! read-then-mutate sequence (expiry check then evict, lookup then touch,
//! intent hit then prompt re-association, the whole write path) inside one
//! lock acquisition. Events produced during a critical section are buffered
//! and handed to the [`EventSink`] after the lock is released.
//!
//! Expiry is lazy: an entry is only found to be expired when a lookup or a
//! write walks into it.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use tracing::debug;

use super::clock::{seconds_until, Clock, SystemClock};
use super::decision::Decision;
use super::events::{CacheEvent, EventSink, EvictReason, NoopSink};
use super::intent::{extract_intent, IntentGuard};
use super::metrics::{CacheMetrics, MetricsSnapshot};
use super::normalize::normalize_prompt;
use super::store::{expiry_after, AssociationIndex, EntryId, EntryStore};
use crate::config::{CacheConfig, IntentConfig};

/// Capacity used when none is configured.
pub const DEFAULT_MAX_ENTRIES: usize = 10;

/// Intent-aware response cache with LRU and TTL eviction.
pub struct CacheEngine {
    store: Mutex<EntryStore>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
    metrics: CacheMetrics,
    guard: IntentGuard,
    intent_enabled: bool,
}

impl std::fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEngine")
            .field("entries", &self.len())
            .field("guard", &self.guard)
            .field("intent_enabled", &self.intent_enabled)
            .finish()
    }
}

impl CacheEngine {
    /// Engine with the system clock, no event sink and default intent settings.
    pub fn new(max_entries: usize) -> Self {
        Self::builder().max_entries(max_entries).build()
    }

    pub fn builder() -> CacheEngineBuilder {
        CacheEngineBuilder::new()
    }

    /// Decide how a prompt is served: exact hit, intent hit, or miss.
    pub fn decide(&self, prompt: &str) -> Decision {
        let prompt = normalize_prompt(prompt);
        let now = self.clock.now();
        let mut pending = Vec::new();

        let decision = {
            let mut store = self.lock();
            self.decide_locked(&mut store, &prompt, now, &mut pending)
        };

        self.metrics.record_decision(decision.kind());
        self.flush(pending);
        decision
    }

    fn decide_locked(
        &self,
        store: &mut EntryStore,
        prompt: &str,
        now: DateTime<Utc>,
        pending: &mut Vec<CacheEvent>,
    ) -> Decision {
        if let Some(entry_id) = store.lookup_by_prompt(prompt).cloned() {
            if let Some(expires_at) = store.get(&entry_id).map(|e| e.expires_at) {
                if now <= expires_at {
                    store.touch(&entry_id);
                    return Decision::Exact {
                        ttl_remaining: seconds_until(expires_at, now),
                        entry_id,
                    };
                }
                self.expire(store, &entry_id, expires_at, now, pending);
            }
        }

        if !self.intent_enabled || !self.guard.allows(prompt) {
            return Decision::Miss;
        }
        let Some(intent) = extract_intent(prompt) else {
            return Decision::Miss;
        };
        let intent_key = intent.key();

        if let Some(entry_id) = store.lookup_by_intent(&intent_key).cloned() {
            if let Some(expires_at) = store.get(&entry_id).map(|e| e.expires_at) {
                if now <= expires_at {
                    store.touch(&entry_id);
                    store.associate_prompt(prompt, &entry_id);
                    debug!(entry_id = %entry_id, intent_key = %intent_key, "Intent hit");
                    return Decision::Intent {
                        ttl_remaining: seconds_until(expires_at, now),
                        confidence: intent.confidence,
                        entry_id,
                        intent_key,
                    };
                }
                self.expire(store, &entry_id, expires_at, now, pending);
            }
        }

        Decision::Miss
    }

    fn expire(
        &self,
        store: &mut EntryStore,
        entry_id: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
        pending: &mut Vec<CacheEvent>,
    ) {
        debug!(entry_id, "Cache entry expired, removing");
        store.evict(entry_id);
        self.metrics.record_expired();
        pending.push(CacheEvent::Expire {
            entry_id: entry_id.to_string(),
            expired_at: expires_at,
            observed_at: now,
        });
    }

    /// Store a freshly generated response for `prompt`.
    ///
    /// A prompt already mapped to a live entry refreshes that entry in place.
    /// Otherwise a new entry is created, the prompt (and its intent key, when
    /// the guardrail allows extraction) is pointed at it, and least-recently
    /// used entries are evicted until the store is back within capacity.
    pub fn record_response(&self, prompt: &str, response: &str, ttl_secs: u64) -> EntryId {
        let prompt = normalize_prompt(prompt);
        let now = self.clock.now();
        let mut pending = Vec::new();

        let entry_id = {
            let mut store = self.lock();
            let entry_id = self.record_locked(&mut store, &prompt, response, ttl_secs, now, &mut pending);
            debug_assert!(
                store.verify_invariants().is_ok(),
                "{:?}",
                store.verify_invariants()
            );
            entry_id
        };

        self.metrics.record_write();
        self.flush(pending);
        entry_id
    }

    fn record_locked(
        &self,
        store: &mut EntryStore,
        prompt: &str,
        response: &str,
        ttl_secs: u64,
        now: DateTime<Utc>,
        pending: &mut Vec<CacheEvent>,
    ) -> EntryId {
        if let Some(entry_id) = store.lookup_by_prompt(prompt).cloned() {
            if let Some(expires_at) = store.get(&entry_id).map(|e| e.expires_at) {
                if now <= expires_at {
                    store.refresh(&entry_id, response.to_string(), expiry_after(now, ttl_secs));
                    store.touch(&entry_id);
                    pending.push(CacheEvent::Write {
                        entry_id: entry_id.clone(),
                        prompt: prompt.to_string(),
                        ttl_seconds: ttl_secs,
                        update: true,
                    });
                    return entry_id;
                }
                if let Some(evicted) = store.evict(&entry_id) {
                    self.metrics.record_expired();
                    pending.push(CacheEvent::Evict {
                        entry_id: evicted.entry_id,
                        reason: EvictReason::Expired,
                        prompts: evicted.prompts,
                        intents: evicted.intents,
                    });
                }
            }
        }

        let entry_id = store.create_entry(response.to_string(), ttl_secs, now);
        store.associate_prompt(prompt, &entry_id);
        pending.push(CacheEvent::Write {
            entry_id: entry_id.clone(),
            prompt: prompt.to_string(),
            ttl_seconds: ttl_secs,
            update: false,
        });

        if self.intent_enabled && self.guard.allows(prompt) {
            if let Some(intent) = extract_intent(prompt) {
                store.associate_intent(&intent.key(), &entry_id);
            }
        }

        let evicted = store.enforce_capacity();
        self.metrics.record_evicted(evicted.len() as u64);
        for removed in evicted {
            pending.push(CacheEvent::Evict {
                entry_id: removed.entry_id,
                reason: EvictReason::Capacity,
                prompts: removed.prompts,
                intents: removed.intents,
            });
        }

        entry_id
    }

    /// The stored response for an entry, if it is still present.
    pub fn response(&self, entry_id: &str) -> Option<String> {
        self.lock().get(entry_id).map(|e| e.response.clone())
    }

    /// Forward an event produced outside the engine (the request layer's
    /// decision report) to the configured sink.
    pub fn emit(&self, event: CacheEvent) {
        self.events.emit(&event);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn emit_metrics_summary(&self, reason: &str) {
        self.metrics.emit_summary(reason);
    }

    /// Check index duality and the capacity bound.
    pub fn verify_invariants(&self) -> Result<(), String> {
        let store = self.lock();
        if store.len() > store.capacity() {
            return Err(format!(
                "{} entries exceed capacity {}",
                store.len(),
                store.capacity()
            ));
        }
        store.verify_invariants()
    }

    /// Entries in LRU order (least-recently-used first).
    pub fn dump_entries(&self) -> Value {
        let now = self.clock.now();
        let store = self.lock();
        let entries: Vec<Value> = store
            .entries()
            .map(|entry| {
                json!({
                    "id": entry.id,
                    "response": entry.response,
                    "expires_at": entry.expires_at.to_rfc3339(),
                    "ttl_remaining": seconds_until(entry.expires_at, now),
                    "expired": now > entry.expires_at,
                })
            })
            .collect();
        json!({
            "count": entries.len(),
            "capacity": store.capacity(),
            "entries": entries,
        })
    }

    pub fn dump_prompt_index(&self) -> Value {
        let store = self.lock();
        dump_index(store.prompt_index(), "prompt_to_entry_id", "entry_id_to_prompts")
    }

    pub fn dump_intent_index(&self) -> Value {
        let store = self.lock();
        dump_index(store.intent_index(), "intent_to_entry_id", "entry_id_to_intents")
    }

    fn lock(&self) -> MutexGuard<'_, EntryStore> {
        self.store.lock().expect("cache store lock poisoned")
    }

    fn flush(&self, pending: Vec<CacheEvent>) {
        for event in &pending {
            self.events.emit(event);
        }
    }
}

fn dump_index(index: &AssociationIndex, forward_name: &str, reverse_name: &str) -> Value {
    let forward: Map<String, Value> = index
        .forward()
        .iter()
        .map(|(key, id)| (key.clone(), Value::String(id.clone())))
        .collect();
    let reverse: Map<String, Value> = index
        .reverse()
        .iter()
        .map(|(id, keys)| (id.clone(), json!(keys.iter().collect::<Vec<_>>())))
        .collect();
    let mut out = Map::new();
    out.insert(forward_name.to_string(), Value::Object(forward));
    out.insert(reverse_name.to_string(), Value::Object(reverse));
    Value::Object(out)
}

/// Builder for [`CacheEngine`].
pub struct CacheEngineBuilder {
    max_entries: usize,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
    guard: IntentGuard,
    intent_enabled: bool,
}

impl CacheEngineBuilder {
    pub fn new() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            clock: Arc::new(SystemClock),
            events: Arc::new(NoopSink),
            guard: IntentGuard::default(),
            intent_enabled: true,
        }
    }

    /// Apply the `cache` and `intent` config sections.
    pub fn config(self, cache: &CacheConfig, intent: &IntentConfig) -> Self {
        self.max_entries(cache.max_entries)
            .intent_enabled(intent.enabled)
            .intent_guard(IntentGuard::new(intent.max_prompt_chars))
    }

    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn intent_guard(mut self, guard: IntentGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn intent_enabled(mut self, enabled: bool) -> Self {
        self.intent_enabled = enabled;
        self
    }

    pub fn build(self) -> CacheEngine {
        CacheEngine {
            store: Mutex::new(EntryStore::new(self.max_entries)),
            clock: self.clock,
            events: self.events,
            metrics: CacheMetrics::new(),
            guard: self.guard,
            intent_enabled: self.intent_enabled,
        }
    }
}

impl Default for CacheEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
