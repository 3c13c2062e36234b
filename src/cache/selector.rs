//! Startup backend selection
//!
//! Redis is used when it answers at startup; otherwise the process runs on
//! the in-process fallback for its whole lifetime.

use std::sync::Arc;

use tracing::{info, warn};

use super::{CacheBackend, InMemoryCache, RedisCache, RedisSettings};
use crate::config::Config;

/// Pick the cache backend for this process
pub async fn select_backend(config: &Config) -> Arc<dyn CacheBackend> {
    select_with(
        RedisSettings::from_config(config),
        config.memory_cache_max_entries,
    )
    .await
}

/// Pick a backend from explicit settings
pub async fn select_with(
    settings: RedisSettings,
    memory_max_entries: Option<usize>,
) -> Arc<dyn CacheBackend> {
    let url = settings.url.clone();

    match RedisCache::connect(settings).await {
        Ok(redis) => {
            if redis.ping().await {
                info!(url = %url, "Using Redis cache backend");
                return Arc::new(redis);
            }
            redis.close().await;
            warn!(url = %url, "Redis did not answer PING, falling back to in-memory cache");
        }
        Err(e) => {
            warn!(url = %url, error = %e, "Redis unavailable, falling back to in-memory cache");
        }
    }

    info!(
        max_entries = ?memory_max_entries,
        "Using in-memory cache backend"
    );
    Arc::new(InMemoryCache::new(memory_max_entries))
}
