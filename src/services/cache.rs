use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// A thread-safe cache with per-entry TTL and single-flight loading.
///
/// Concurrent misses for the same key are coalesced: the first caller runs
/// the loader while the others wait on a per-key lock and then read the
/// value it stored.
pub struct Cache<V> {
    data: DashMap<String, CacheEntry<V>>,
    inflight: DashMap<String, Arc<Mutex<()>>>,
}

struct CacheEntry<V> {
    value: V,
    fetched_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.fetched_at) < self.ttl
    }
}

impl<V: Clone> Cache<V> {
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            inflight: DashMap::new(),
        }
    }

    /// Get a value if it is younger than its TTL.
    pub fn get(&self, key: &str) -> Option<V> {
        let entry = self.data.get(key)?;
        if entry.is_fresh(Instant::now()) {
            Some(entry.value.clone())
        } else {
            drop(entry);
            self.data.remove(key);
            None
        }
    }

    fn insert(&self, key: String, value: V, ttl: Duration) {
        self.data.insert(
            key,
            CacheEntry {
                value,
                fetched_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Return the cached value or run `load` once for all concurrent callers.
    ///
    /// `load` returns the value together with the TTL to store it under.
    pub async fn get_or_load<F, Fut>(&self, key: &str, load: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = (V, Duration)>,
    {
        if let Some(value) = self.get(key) {
            return value;
        }

        let lock = self
            .inflight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock().await;

        // Another caller may have filled the entry while we waited
        if let Some(value) = self.get(key) {
            return value;
        }

        let (value, ttl) = load().await;
        self.insert(key.to_string(), value.clone(), ttl);

        drop(guard);
        self.inflight
            .remove_if(key, |_, current| Arc::ptr_eq(current, &lock));

        value
    }

    /// Remove all expired entries from the cache.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.data.retain(|_, entry| entry.is_fresh(now));
    }

    /// Get the number of entries in the cache (including expired).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<V: Clone> Default for Cache<V> {
    fn default() -> Self {
        Self::new()
    }
}
