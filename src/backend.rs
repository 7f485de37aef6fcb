use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::error::BackendError;

/// Storage contract the orchestrator depends on.
///
/// Keys are opaque strings; eviction, persistence, distribution, and retries
/// are entirely the backend's own concern. A `ttl`
/// of `None` means backend-default retention.
///
/// Implementations shared across threads carry their own synchronization; the
/// orchestrator calls these methods from whichever thread invokes the cached
/// callable.
pub trait CacheBackend {
    /// The stored value type.
    type Value;

    /// Looks up `key`. `Ok(None)` is a miss; an `Err` is a backend failure
    /// and is never treated as a miss.
    fn get(&self, key: &str) -> Result<Option<Self::Value>, BackendError>;

    /// Stores `value` under `key` with the given retention.
    fn set(&self, key: &str, value: Self::Value, ttl: Option<Duration>)
        -> Result<(), BackendError>;

    /// Removes `key`. Deleting an absent key is not an error.
    fn delete(&self, key: &str) -> Result<(), BackendError>;
}

/// A stored value together with its insertion instant and retention.
struct StoredEntry<V> {
    value: V,
    inserted_at: Instant,
    ttl: Option<Duration>,
}

impl<V> StoredEntry<V> {
    fn new(value: V, ttl: Option<Duration>) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
            ttl,
        }
    }

    fn is_expired(&self) -> bool {
        match self.ttl {
            Some(ttl) => self.inserted_at.elapsed() >= ttl,
            None => false,
        }
    }
}

/// Concurrent in-memory reference backend.
///
/// Entries carry their own TTL; an expired entry reads as a miss and is
/// dropped lazily on the read that observes the expiry. Without a TTL an
/// entry is retained until deleted (the backend-default retention here is
/// "forever").
///
/// This backend never fails: every operation returns `Ok`.
///
/// # Examples
///
/// ```
/// use generic_cache::{CacheBackend, InMemoryBackend};
///
/// let backend = InMemoryBackend::new();
/// backend.set("k", 42, None).unwrap();
/// assert_eq!(backend.get("k").unwrap(), Some(42));
/// backend.delete("k").unwrap();
/// assert_eq!(backend.get("k").unwrap(), None);
/// ```
pub struct InMemoryBackend<V> {
    entries: DashMap<String, StoredEntry<V>>,
}

impl<V> InMemoryBackend<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of live entries, expired ones included until they are observed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// True if the key is present, expired entries included.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl<V> Default for InMemoryBackend<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> CacheBackend for InMemoryBackend<V> {
    type Value = V;

    fn get(&self, key: &str) -> Result<Option<V>, BackendError> {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.is_expired() => true,
            Some(entry) => return Ok(Some(entry.value.clone())),
            None => return Ok(None),
        };
        if expired {
            // Re-check under the removal: a concurrent set may have replaced
            // the entry since the read guard was dropped.
            self.entries.remove_if(key, |_, entry| entry.is_expired());
        }
        Ok(None)
    }

    fn set(&self, key: &str, value: V, ttl: Option<Duration>) -> Result<(), BackendError> {
        self.entries
            .insert(key.to_string(), StoredEntry::new(value, ttl));
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), BackendError> {
        self.entries.remove(key);
        Ok(())
    }
}
