//! In-process fallback cache
//!
//! Used when Redis is unreachable at startup. Entries carry an optional
//! absolute expiry and are dropped lazily on read. A single mutex guards
//! the whole map, so reads and writes serialize against each other.
//!
//! When a capacity is configured and a new key arrives at capacity, one
//! already-expired entry is evicted if there is any; otherwise the oldest
//! inserted entry goes. Overwriting an existing key keeps its insertion
//! position.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{BackendKind, CacheBackend};

/// Entry in the in-memory cache with expiration
struct CacheEntry {
    value: Value,
    expires_at: Option<Instant>,
    inserted: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|exp| now > exp).unwrap_or(false)
    }
}

#[derive(Default)]
struct Store {
    entries: HashMap<String, CacheEntry>,
    next_insert: u64,
}

impl Store {
    fn read(&mut self, key: &str, now: Instant) -> Option<Value> {
        let entry = self.entries.get(key)?;
        if !entry.is_expired(now) {
            return Some(entry.value.clone());
        }
        self.entries.remove(key);
        None
    }

    fn write(
        &mut self,
        key: &str,
        value: Value,
        expires_at: Option<Instant>,
        max_entries: Option<usize>,
        now: Instant,
    ) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.value = value;
            entry.expires_at = expires_at;
            return;
        }

        if let Some(max) = max_entries {
            if self.entries.len() >= max {
                self.evict_one(now);
            }
        }

        let inserted = self.next_insert;
        self.next_insert += 1;
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at,
                inserted,
            },
        );
    }

    fn evict_one(&mut self, now: Instant) {
        let victim = self
            .entries
            .iter()
            .find(|(_, entry)| entry.is_expired(now))
            .or_else(|| self.entries.iter().min_by_key(|(_, entry)| entry.inserted))
            .map(|(key, _)| key.clone());

        if let Some(key) = victim {
            debug!(key = %key, "Evicting fallback cache entry");
            self.entries.remove(&key);
        }
    }
}

/// Bounded in-process cache implementing [`CacheBackend`]
///
/// ```
/// use reward_engine::cache::{CacheBackend, InMemoryCache};
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let cache = InMemoryCache::new(Some(2));
/// cache.set("a", json!(1), None).await;
/// cache.set("b", json!(2), None).await;
/// cache.set("c", json!(3), None).await;
///
/// assert_eq!(cache.get("a").await, None);
/// assert_eq!(cache.get("c").await, Some(json!(3)));
/// # });
/// ```
pub struct InMemoryCache {
    store: Mutex<Store>,
    max_entries: Option<usize>,
}

impl InMemoryCache {
    /// Create a cache holding at most `max_entries` keys (None = unbounded)
    pub fn new(max_entries: Option<usize>) -> Self {
        Self {
            store: Mutex::new(Store::default()),
            max_entries: max_entries.filter(|max| *max > 0),
        }
    }

    /// Number of stored entries, including ones that expired but were not yet read
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all entries (useful for test isolation)
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Absolute expiry for a TTL; zero or unrepresentable TTLs never expire
fn expiry(now: Instant, ttl: Option<Duration>) -> Option<Instant> {
    ttl.filter(|ttl| !ttl.is_zero())
        .and_then(|ttl| now.checked_add(ttl))
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn get(&self, key: &str) -> Option<Value> {
        self.lock().read(key, Instant::now())
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> bool {
        let now = Instant::now();
        self.lock()
            .write(key, value, expiry(now, ttl), self.max_entries, now);
        true
    }

    async fn mget(&self, keys: &[String]) -> Vec<Option<Value>> {
        let now = Instant::now();
        let mut store = self.lock();
        keys.iter().map(|key| store.read(key, now)).collect()
    }

    async fn mset(&self, entries: Vec<(String, Value)>, ttl: Option<Duration>) -> bool {
        let now = Instant::now();
        let expires_at = expiry(now, ttl);
        let mut store = self.lock();
        for (key, value) in entries {
            store.write(&key, value, expires_at, self.max_entries, now);
        }
        true
    }

    async fn ping(&self) -> bool {
        true
    }

    async fn close(&self) {
        self.clear();
    }
}
