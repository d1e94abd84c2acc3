//! Time-expiring memoization.
//!
//! A [`TtlCache`] remembers the result of an operation per argument key for a
//! fixed time-to-live. Expiry is only checked on access: a stale entry stays
//! in the map until the next lookup for its key recomputes and overwrites it.
//! There is no size bound and no background sweep.

use std::{
    collections::HashMap,
    future::Future,
    hash::Hash,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::time::Instant;

/// How long a memoized result stays fresh unless configured otherwise.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug)]
struct Entry<V> {
    value: V,
    expiry: Instant,
}

/// One memo table, owned by exactly one operation of one client.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K, V> Default for TtlCache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<K, V> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of entries held, stale ones included.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<K, Entry<V>>> {
        // a panic while holding the lock can't leave a half-written entry
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Returns the cached value for `key` if it has not expired yet.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        self.entries()
            .get(key)
            .filter(|e| now < e.expiry)
            .map(|e| e.value.clone())
    }

    /// Stores `value` under `key`, fresh for one ttl starting now.
    pub fn insert(&self, key: K, value: V) {
        let expiry = Instant::now() + self.ttl;
        self.entries().insert(key, Entry { value, expiry });
    }

    /// Returns the fresh cached value for `key`, or runs `f` and caches what it
    /// produces. Errors are handed back to the caller and never cached.
    ///
    /// The lock is released while `f` runs, so two concurrent misses on the
    /// same key both compute and the later insert wins.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: K, f: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key) {
            tracing::debug!("cache hit");
            return Ok(value);
        }
        tracing::debug!("cache miss");
        let value = f().await?;
        self.insert(key, value.clone());
        Ok(value)
    }
}
