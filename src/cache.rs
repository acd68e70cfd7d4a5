use std::{
    collections::HashMap,
    hash::Hash,
    time::{Duration, Instant},
};

/// A map whose entries go stale. The TTL is given at lookup time, so one
/// cache can hold values with different lifetimes. Time is passed in
/// explicitly so callers (and tests) control the clock.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: HashMap<K, Entry<V>>,
}

#[derive(Debug)]
struct Entry<V> {
    stored_at: Instant,
    value: V,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Get a value if it was stored less than `ttl` ago
    pub fn get(&self, key: &K, ttl: Duration, now: Instant) -> Option<V> {
        let entry = self.entries.get(key)?;
        if now.saturating_duration_since(entry.stored_at) < ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    pub fn insert(&mut self, key: K, value: V, now: Instant) {
        self.entries.insert(
            key,
            Entry {
                stored_at: now,
                value,
            },
        );
    }

    /// Drop everything older than `max_age`, to keep the map from growing
    /// forever
    pub fn purge(&mut self, now: Instant, max_age: Duration) {
        self.entries.retain(|_, entry| {
            now.saturating_duration_since(entry.stored_at) < max_age
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Eq + Hash, V: Clone> Default for TtlCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
