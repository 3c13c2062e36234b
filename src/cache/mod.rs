//! Cache module
//!
//! Two interchangeable key/value backends behind one [`CacheBackend`] trait:
//! a Redis client with health tracking and a bounded in-process fallback.
//! [`select_backend`] picks one at startup and the rest of the process only
//! ever sees the trait object.
//!
//! Every operation is infallible from the caller's point of view. Transport
//! and decoding problems are logged inside the backend and surface as an
//! absent value or a `false` write result.

pub mod in_memory;
pub mod redis;
pub mod selector;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use self::in_memory::InMemoryCache;
pub use self::redis::{RedisCache, RedisSettings};
pub use self::selector::select_backend;

/// Which backend a [`CacheBackend`] trait object is
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Redis,
    Memory,
}

/// Capability contract shared by both cache backends
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Backend variant, for health reporting
    fn kind(&self) -> BackendKind;

    /// Value at `key`, or `None` when missing, expired or unreadable
    async fn get(&self, key: &str) -> Option<Value>;

    /// Store `value` at `key`. A `None` TTL means no expiry.
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> bool;

    /// Batched `get`; the result has one slot per key, in input order
    async fn mget(&self, keys: &[String]) -> Vec<Option<Value>>;

    /// Batched `set` applying the same TTL to every entry
    async fn mset(&self, entries: Vec<(String, Value)>, ttl: Option<Duration>) -> bool;

    /// Liveness probe
    async fn ping(&self) -> bool;

    /// Release held resources. Calling it more than once is harmless.
    async fn close(&self);
}

/// Errors raised while establishing a cache backend
///
/// These never cross the [`CacheBackend`] boundary; they only escape from
/// [`RedisCache::connect`] so the selector can fall back.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to connect to Redis: {0}")]
    Connection(String),

    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("Redis {0} timed out")]
    Timeout(&'static str),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Cache key layout
pub mod keys {
    /// Stored decision for a (transaction, user, merchant) triple
    pub fn idempotency(txn_id: &str, user_id: &str, merchant_id: &str) -> String {
        format!("idem:{}:{}:{}", txn_id, user_id, merchant_id)
    }

    /// Persona tier of a user
    pub fn persona(user_id: &str) -> String {
        format!("persona:{}", user_id)
    }

    /// Lifetime decision count of a user
    pub fn txn_count(user_id: &str) -> String {
        format!("txn_count:{}", user_id)
    }

    /// Credited value granted to a user on `day` (YYYY-MM-DD)
    pub fn daily_cac(user_id: &str, day: &str) -> String {
        format!("cac:{}:{}", user_id, day)
    }
}
