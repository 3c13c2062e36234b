//! Redis cache implementation
//!
//! Wraps a multiplexed [`ConnectionManager`] with per-command timeouts,
//! uniform JSON encoding and consecutive-error tracking. Once the error
//! count reaches the configured threshold, commands are skipped until a
//! health probe succeeds; probes run at most once per health-check
//! interval so a dead Redis costs one timeout per interval instead of one
//! per request.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisResult};
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{BackendKind, CacheBackend, CacheError};
use crate::config::Config;
use crate::routes::metrics::record_cache_operation;

/// How long an encoded value may be reused for the same key
const ENCODED_VALUE_TTL: Duration = Duration::from_secs(60);

/// Encoded-value cache size that triggers a sweep of stale entries
const ENCODED_VALUE_SWEEP_THRESHOLD: usize = 1024;

/// Connection and resilience settings for [`RedisCache`]
#[derive(Debug, Clone)]
pub struct RedisSettings {
    pub url: String,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
    pub health_check_interval: Duration,
    pub max_consecutive_errors: u32,
}

impl RedisSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            url: config.redis_url.clone(),
            connect_timeout: config.redis_connect_timeout,
            command_timeout: config.redis_socket_timeout,
            health_check_interval: config.redis_health_check_interval,
            max_consecutive_errors: config.redis_max_consecutive_errors,
        }
    }
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(5),
            health_check_interval: Duration::from_secs(30),
            max_consecutive_errors: 3,
        }
    }
}

#[derive(Debug)]
struct HealthState {
    healthy: bool,
    last_check: Option<Instant>,
}

struct EncodedValue {
    value: Value,
    encoded: String,
    encoded_at: Instant,
}

/// Redis-backed [`CacheBackend`]
pub struct RedisCache {
    conn: RwLock<Option<ConnectionManager>>,
    settings: RedisSettings,
    consecutive_errors: AtomicU32,
    health: Mutex<HealthState>,
    encoded: Mutex<HashMap<String, EncodedValue>>,
}

impl RedisCache {
    /// Connect and verify the server answers PING
    ///
    /// Fails with [`CacheError::Connection`] when Redis cannot be reached
    /// within the connect timeout.
    pub async fn connect(settings: RedisSettings) -> Result<Self, CacheError> {
        let client = redis::Client::open(settings.url.as_str())
            .map_err(|e| CacheError::Connection(format!("{}: {}", settings.url, e)))?;

        let mut conn = timeout(settings.connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                CacheError::Connection(format!("{}: connect timed out", settings.url))
            })?
            .map_err(|e| CacheError::Connection(format!("{}: {}", settings.url, e)))?;

        timeout(
            settings.connect_timeout,
            redis::cmd("PING").query_async::<_, String>(&mut conn),
        )
        .await
        .map_err(|_| CacheError::Connection(format!("{}: PING timed out", settings.url)))?
        .map_err(|e| CacheError::Connection(format!("{}: {}", settings.url, e)))?;

        info!(url = %settings.url, "Connected to Redis");

        Ok(Self {
            conn: RwLock::new(Some(conn)),
            settings,
            consecutive_errors: AtomicU32::new(0),
            health: Mutex::new(HealthState {
                healthy: true,
                last_check: None,
            }),
            encoded: Mutex::new(HashMap::new()),
        })
    }

    /// Current count of consecutive transport errors
    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors.load(Ordering::Relaxed)
    }

    /// Whether the last health observation was positive
    pub fn is_healthy(&self) -> bool {
        self.health_state().healthy
    }

    fn connection(&self) -> Option<ConnectionManager> {
        self.conn
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn health_state(&self) -> MutexGuard<'_, HealthState> {
        self.health.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a command should be sent at all
    async fn should_attempt(&self) -> bool {
        if self.consecutive_errors() < self.settings.max_consecutive_errors {
            return true;
        }
        self.check_health_on_error().await
    }

    /// Probe Redis, at most once per health-check interval
    ///
    /// Between probes the last observed health is returned unchanged.
    async fn check_health_on_error(&self) -> bool {
        {
            let mut health = self.health_state();
            if let Some(last) = health.last_check {
                if last.elapsed() < self.settings.health_check_interval {
                    return health.healthy;
                }
            }
            health.last_check = Some(Instant::now());
        }

        let Some(mut conn) = self.connection() else {
            self.health_state().healthy = false;
            return false;
        };

        let probe = timeout(
            self.settings.command_timeout,
            redis::cmd("PING").query_async::<_, String>(&mut conn),
        )
        .await;

        let mut health = self.health_state();
        match probe {
            Ok(Ok(_)) => {
                if !health.healthy {
                    info!("Redis recovered, resuming cache operations");
                }
                health.healthy = true;
                self.consecutive_errors.store(0, Ordering::Relaxed);
                true
            }
            _ => {
                health.healthy = false;
                let errors = self.consecutive_errors.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(consecutive_errors = errors, "Redis health probe failed");
                false
            }
        }
    }

    /// Run a command under the command timeout
    async fn execute<T, F>(&self, operation: &'static str, command: F) -> Result<T, CacheError>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match timeout(self.settings.command_timeout, command).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CacheError::Redis(e)),
            Err(_) => Err(CacheError::Timeout(operation)),
        }
    }

    fn record_success(&self, operation: &'static str) {
        self.consecutive_errors.store(0, Ordering::Relaxed);
        record_cache_operation(operation, "ok");
    }

    /// Classify a failed command and update health tracking
    async fn record_failure(&self, operation: &'static str, error: &CacheError) {
        record_cache_operation(operation, "error");

        if !is_transport_error(error) {
            warn!(operation, error = %error, "Redis command failed");
            return;
        }

        self.health_state().healthy = false;
        let errors = self.consecutive_errors.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(
            operation,
            error = %error,
            consecutive_errors = errors,
            "Redis connection error"
        );
        self.check_health_on_error().await;
    }

    /// JSON-encode a value, reusing the last encoding for an identical value
    fn encode(&self, key: &str, value: &Value) -> Result<String, CacheError> {
        let now = Instant::now();
        let mut encoded = self.encoded.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(hit) = encoded.get(key) {
            if now.duration_since(hit.encoded_at) < ENCODED_VALUE_TTL && hit.value == *value {
                return Ok(hit.encoded.clone());
            }
        }

        let serialized = serde_json::to_string(value)?;

        if encoded.len() >= ENCODED_VALUE_SWEEP_THRESHOLD {
            encoded.retain(|_, e| now.duration_since(e.encoded_at) < ENCODED_VALUE_TTL);
        }
        encoded.insert(
            key.to_string(),
            EncodedValue {
                value: value.clone(),
                encoded: serialized.clone(),
                encoded_at: now,
            },
        );

        Ok(serialized)
    }
}

/// Decode a stored string
///
/// Values are JSON-encoded on write. Strings that are not valid JSON were
/// written before uniform encoding and are returned as plain strings.
pub fn decode_value(raw: String) -> Value {
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(_) => Value::String(raw),
    }
}

fn is_transport_error(error: &CacheError) -> bool {
    match error {
        CacheError::Timeout(_) | CacheError::Connection(_) => true,
        CacheError::Redis(e) => {
            e.is_timeout()
                || e.is_connection_dropped()
                || e.is_connection_refusal()
                || e.is_io_error()
        }
        CacheError::Serialization(_) => false,
    }
}

fn ttl_seconds(ttl: Option<Duration>) -> Option<u64> {
    ttl.filter(|ttl| !ttl.is_zero())
        .map(|ttl| ttl.as_secs().max(1))
}

#[async_trait]
impl CacheBackend for RedisCache {
    fn kind(&self) -> BackendKind {
        BackendKind::Redis
    }

    async fn get(&self, key: &str) -> Option<Value> {
        let mut conn = self.connection()?;
        if !self.should_attempt().await {
            debug!(key, "Redis suppressed, treating read as miss");
            return None;
        }

        match self.execute("get", conn.get::<_, Option<String>>(key)).await {
            Ok(raw) => {
                self.record_success("get");
                raw.map(decode_value)
            }
            Err(e) => {
                self.record_failure("get", &e).await;
                None
            }
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> bool {
        let Some(mut conn) = self.connection() else {
            return false;
        };
        if !self.should_attempt().await {
            debug!(key, "Redis suppressed, dropping write");
            return false;
        }

        let serialized = match self.encode(key, &value) {
            Ok(serialized) => serialized,
            Err(e) => {
                warn!(key, error = %e, "Failed to encode cache value");
                return false;
            }
        };

        let result = match ttl_seconds(ttl) {
            Some(seconds) => {
                self.execute("set", conn.set_ex::<_, _, ()>(key, serialized, seconds))
                    .await
            }
            None => self.execute("set", conn.set::<_, _, ()>(key, serialized)).await,
        };

        match result {
            Ok(()) => {
                self.record_success("set");
                true
            }
            Err(e) => {
                self.record_failure("set", &e).await;
                false
            }
        }
    }

    async fn mget(&self, keys: &[String]) -> Vec<Option<Value>> {
        if keys.is_empty() {
            return Vec::new();
        }
        let Some(mut conn) = self.connection() else {
            return vec![None; keys.len()];
        };
        if !self.should_attempt().await {
            return vec![None; keys.len()];
        }

        let mut command = redis::cmd("MGET");
        command.arg(keys.to_vec());
        let result = self
            .execute(
                "mget",
                command.query_async::<_, Vec<Option<String>>>(&mut conn),
            )
            .await;
        match result {
            Ok(values) if values.len() == keys.len() => {
                self.record_success("mget");
                values
                    .into_iter()
                    .map(|raw| raw.map(decode_value))
                    .collect()
            }
            Ok(values) => {
                warn!(
                    expected = keys.len(),
                    received = values.len(),
                    "Redis MGET returned unexpected number of values"
                );
                vec![None; keys.len()]
            }
            Err(e) => {
                self.record_failure("mget", &e).await;
                vec![None; keys.len()]
            }
        }
    }

    async fn mset(&self, entries: Vec<(String, Value)>, ttl: Option<Duration>) -> bool {
        if entries.is_empty() {
            return false;
        }
        let Some(mut conn) = self.connection() else {
            return false;
        };
        if !self.should_attempt().await {
            return false;
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        let seconds = ttl_seconds(ttl);
        for (key, value) in &entries {
            let serialized = match self.encode(key, value) {
                Ok(serialized) => serialized,
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to encode cache value");
                    return false;
                }
            };
            match seconds {
                Some(seconds) => pipe.set_ex(key, serialized, seconds).ignore(),
                None => pipe.set(key, serialized).ignore(),
            };
        }

        match self.execute("mset", pipe.query_async::<_, ()>(&mut conn)).await {
            Ok(()) => {
                self.record_success("mset");
                true
            }
            Err(e) => {
                self.record_failure("mset", &e).await;
                false
            }
        }
    }

    async fn ping(&self) -> bool {
        let Some(mut conn) = self.connection() else {
            return false;
        };
        matches!(
            self.execute("ping", redis::cmd("PING").query_async::<_, String>(&mut conn))
                .await,
            Ok(_)
        )
    }

    async fn close(&self) {
        let previous = self
            .conn
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.health_state().healthy = false;
        if previous.is_some() {
            info!(url = %self.settings.url, "Redis cache closed");
        }
    }
}
