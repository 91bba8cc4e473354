use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;

struct Entry<V> {
    value: V,
    stored_at: DateTime<Utc>,
}

/// Response cache with an explicit clock. Callers pass `now`, so expiry is testable and the
/// cache holds no ambient time state.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, Entry<V>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Fresh value for `key`; an entry is stale once `ttl` has fully elapsed.
    pub fn get(&self, key: &K, now: DateTime<Utc>) -> Option<V> {
        self.entries
            .get(key)
            .filter(|e| now - e.stored_at < self.ttl)
            .map(|e| e.value.clone())
    }

    pub fn set(&mut self, key: K, value: V, now: DateTime<Utc>) {
        self.entries.insert(
            key,
            Entry {
                value,
                stored_at: now,
            },
        );
    }

    /// Drops stale entries; returns how many were removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, e| now - e.stored_at < ttl);
        before - self.entries.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
