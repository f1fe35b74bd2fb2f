//! Entry store: cache entries, LRU recency and reverse indices.
//!
//! Entries live in an insertion-ordered map whose order *is* the recency
//! order: the front is the least-recently-used entry and `touch` moves an
//! entry to the back. Prompts and intent keys point at entries through an
//! [`AssociationIndex`], which keeps a forward map and a per-entry reverse set
//! so that evicting an entry removes every key pointing at it in O(k).
//!
//! The store records `expires_at` but never compares it against the clock;
//! expiry decisions belong to the engine.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

/// Opaque entry identifier (8 lowercase hex characters).
pub type EntryId = String;

/// A stored response with its absolute expiry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry {
    /// Identifier that prompt and intent keys point at.
    pub id: EntryId,
    /// The cached backend response.
    pub response: String,
    /// Instant after which the entry is stale.
    pub expires_at: DateTime<Utc>,
}

/// What an eviction removed, for logging and events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evicted {
    pub entry_id: EntryId,
    pub prompts: Vec<String>,
    pub intents: Vec<String>,
}

/// Bidirectional key → entry index.
///
/// `forward[k] == e` holds exactly when `k` is in `reverse[e]`.
#[derive(Debug, Default)]
pub struct AssociationIndex {
    forward: HashMap<String, EntryId>,
    reverse: HashMap<EntryId, BTreeSet<String>>,
}

impl AssociationIndex {
    fn open(&mut self, entry_id: &str) {
        self.reverse.entry(entry_id.to_string()).or_default();
    }

    /// Point `key` at `entry_id`, detaching it from its previous entry first.
    /// Returns `false` when the key already pointed there.
    fn associate(&mut self, key: &str, entry_id: &str) -> bool {
        match self.forward.get(key) {
            Some(current) if current == entry_id => return false,
            Some(previous) => {
                if let Some(keys) = self.reverse.get_mut(previous) {
                    keys.remove(key);
                }
            }
            None => {}
        }
        self.forward.insert(key.to_string(), entry_id.to_string());
        self.reverse
            .entry(entry_id.to_string())
            .or_default()
            .insert(key.to_string());
        true
    }

    fn lookup(&self, key: &str) -> Option<&EntryId> {
        self.forward.get(key)
    }

    /// Remove the entry's reverse set and every forward pointer in it.
    fn detach_entry(&mut self, entry_id: &str) -> Vec<String> {
        let keys = self.reverse.remove(entry_id).unwrap_or_default();
        for key in &keys {
            self.forward.remove(key);
        }
        keys.into_iter().collect()
    }

    pub fn forward(&self) -> &HashMap<String, EntryId> {
        &self.forward
    }

    pub fn reverse(&self) -> &HashMap<EntryId, BTreeSet<String>> {
        &self.reverse
    }

    pub fn keys_for(&self, entry_id: &str) -> Option<&BTreeSet<String>> {
        self.reverse.get(entry_id)
    }

    fn check(&self, name: &str, live: &IndexMap<EntryId, CacheEntry>) -> Result<(), String> {
        for (key, entry_id) in &self.forward {
            if !live.contains_key(entry_id) {
                return Err(format!("{name} key {key:?} points at dead entry {entry_id}"));
            }
            let listed = self
                .reverse
                .get(entry_id)
                .is_some_and(|keys| keys.contains(key));
            if !listed {
                return Err(format!(
                    "{name} key {key:?} -> {entry_id} missing from reverse set"
                ));
            }
        }
        for (entry_id, keys) in &self.reverse {
            if !live.contains_key(entry_id) {
                return Err(format!("{name} reverse set kept for dead entry {entry_id}"));
            }
            for key in keys {
                if self.forward.get(key) != Some(entry_id) {
                    return Err(format!(
                        "{name} reverse set of {entry_id} lists {key:?} which points elsewhere"
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Authoritative cache storage with LRU ordering and reverse indices.
#[derive(Debug)]
pub struct EntryStore {
    entries: IndexMap<EntryId, CacheEntry>,
    prompts: AssociationIndex,
    intents: AssociationIndex,
    max_entries: usize,
}

impl EntryStore {
    /// Create an empty store. `max_entries` is clamped to a minimum of 1.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: IndexMap::new(),
            prompts: AssociationIndex::default(),
            intents: AssociationIndex::default(),
            max_entries: max_entries.max(1),
        }
    }

    /// Maximum number of entries kept after `enforce_capacity`.
    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a fresh entry expiring `ttl_secs` after `now` at the MRU end.
    pub fn create_entry(&mut self, response: String, ttl_secs: u64, now: DateTime<Utc>) -> EntryId {
        let id = self.fresh_id();
        let entry = CacheEntry {
            id: id.clone(),
            response,
            expires_at: expiry_after(now, ttl_secs),
        };
        self.entries.insert(id.clone(), entry);
        self.prompts.open(&id);
        self.intents.open(&id);
        debug!(entry_id = %id, ttl_secs, "Created cache entry");
        id
    }

    /// Overwrite an entry's response and expiry. Returns `false` for unknown ids.
    pub fn refresh(&mut self, entry_id: &str, response: String, expires_at: DateTime<Utc>) -> bool {
        match self.entries.get_mut(entry_id) {
            Some(entry) => {
                entry.response = response;
                entry.expires_at = expires_at;
                true
            }
            None => false,
        }
    }

    /// Point a normalized prompt at an entry. No-op for unknown entries.
    pub fn associate_prompt(&mut self, prompt: &str, entry_id: &str) {
        if !self.entries.contains_key(entry_id) {
            return;
        }
        if self.prompts.associate(prompt, entry_id) {
            debug!(entry_id, prompt, "Associated prompt");
        }
    }

    /// Point an intent key at an entry. No-op for unknown entries.
    pub fn associate_intent(&mut self, intent_key: &str, entry_id: &str) {
        if !self.entries.contains_key(entry_id) {
            return;
        }
        if self.intents.associate(intent_key, entry_id) {
            debug!(entry_id, intent_key, "Associated intent");
        }
    }

    /// Entry a normalized prompt points at, if any.
    pub fn lookup_by_prompt(&self, prompt: &str) -> Option<&EntryId> {
        self.prompts.lookup(prompt)
    }

    /// Entry an intent key points at, if any.
    pub fn lookup_by_intent(&self, intent_key: &str) -> Option<&EntryId> {
        self.intents.lookup(intent_key)
    }

    /// Entry by id, without touching recency.
    pub fn get(&self, entry_id: &str) -> Option<&CacheEntry> {
        self.entries.get(entry_id)
    }

    /// Mark an entry most-recently-used. No-op for unknown ids.
    pub fn touch(&mut self, entry_id: &str) {
        if let Some(idx) = self.entries.get_index_of(entry_id) {
            let last = self.entries.len() - 1;
            self.entries.move_index(idx, last);
        }
    }

    /// Remove an entry and every prompt and intent pointing at it.
    ///
    /// Evicting an unknown id is a no-op returning `None`.
    pub fn evict(&mut self, entry_id: &str) -> Option<Evicted> {
        self.entries.shift_remove(entry_id)?;
        let evicted = Evicted {
            entry_id: entry_id.to_string(),
            prompts: self.prompts.detach_entry(entry_id),
            intents: self.intents.detach_entry(entry_id),
        };
        debug!(
            entry_id,
            prompts = evicted.prompts.len(),
            intents = evicted.intents.len(),
            "Evicted cache entry"
        );
        Some(evicted)
    }

    /// Evict least-recently-used entries until the store is within capacity.
    pub fn enforce_capacity(&mut self) -> Vec<Evicted> {
        let mut evicted = Vec::new();
        while self.entries.len() > self.max_entries {
            let Some(oldest) = self.entries.get_index(0).map(|(id, _)| id.clone()) else {
                break;
            };
            if let Some(removed) = self.evict(&oldest) {
                evicted.push(removed);
            }
        }
        evicted
    }

    /// Entries from least- to most-recently-used.
    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.values()
    }

    pub fn prompt_index(&self) -> &AssociationIndex {
        &self.prompts
    }

    pub fn intent_index(&self) -> &AssociationIndex {
        &self.intents
    }

    /// Check index duality and entry keying, describing the first violation
    /// found. Capacity is not checked: it only holds once a write has run
    /// [`enforce_capacity`](Self::enforce_capacity).
    pub fn verify_invariants(&self) -> Result<(), String> {
        for (id, entry) in &self.entries {
            if &entry.id != id {
                return Err(format!("entry keyed {id} carries id {}", entry.id));
            }
        }
        self.prompts.check("prompt", &self.entries)?;
        self.intents.check("intent", &self.entries)
    }

    fn fresh_id(&self) -> EntryId {
        loop {
            let id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
            if !self.entries.contains_key(&id) {
                return id;
            }
        }
    }
}

/// `now + ttl_secs`, saturating at the largest representable instant.
pub fn expiry_after(now: DateTime<Utc>, ttl_secs: u64) -> DateTime<Utc> {
    let secs = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
    Duration::try_seconds(secs)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
