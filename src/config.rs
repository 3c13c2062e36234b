//! Configuration management for the reward engine
//!
//! Process configuration is loaded from environment variables. The reward
//! policy itself lives in [`crate::policy`] and is loaded separately.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Redis connection URL
    pub redis_url: String,
    /// Timeout for establishing the Redis connection
    pub redis_connect_timeout: Duration,
    /// Timeout for individual Redis commands
    pub redis_socket_timeout: Duration,
    /// Minimum spacing between Redis health probes
    pub redis_health_check_interval: Duration,
    /// Consecutive transport errors before Redis calls are suppressed
    pub redis_max_consecutive_errors: u32,

    /// Capacity of the in-process fallback cache (None = unbounded)
    pub memory_cache_max_entries: Option<usize>,

    /// JSON policy file; built-in defaults are used when unset
    pub policy_path: Option<PathBuf>,

    /// Enable the persona override registry
    pub persona_overrides_enabled: bool,
    /// JSON file of `{user_id: persona}` overrides
    pub persona_overrides_path: Option<PathBuf>,

    /// Expose persona override and policy reload endpoints
    pub admin_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("REWARD_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("REWARD_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .context("Invalid REWARD_PORT")?,

            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            redis_connect_timeout: Duration::from_secs(
                env::var("REDIS_CONNECT_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .context("Invalid REDIS_CONNECT_TIMEOUT_SECONDS")?,
            ),
            redis_socket_timeout: Duration::from_secs(
                env::var("REDIS_SOCKET_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .context("Invalid REDIS_SOCKET_TIMEOUT_SECONDS")?,
            ),
            redis_health_check_interval: Duration::from_secs(
                env::var("REDIS_HEALTH_CHECK_INTERVAL_SECONDS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("Invalid REDIS_HEALTH_CHECK_INTERVAL_SECONDS")?,
            ),
            redis_max_consecutive_errors: env::var("REDIS_MAX_CONSECUTIVE_ERRORS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("Invalid REDIS_MAX_CONSECUTIVE_ERRORS")?,

            memory_cache_max_entries: env::var("MEMORY_CACHE_MAX_ENTRIES")
                .ok()
                .map(|v| v.parse())
                .transpose()
                .context("Invalid MEMORY_CACHE_MAX_ENTRIES")?,

            policy_path: env::var("POLICY_CONFIG_PATH").ok().map(PathBuf::from),

            persona_overrides_enabled: parse_flag("PERSONA_OVERRIDES_ENABLED"),
            persona_overrides_path: env::var("PERSONA_OVERRIDES_PATH").ok().map(PathBuf::from),

            admin_enabled: parse_flag("REWARD_ADMIN_ENABLED"),
        })
    }
}

fn parse_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}
