//! Reward engine - reward decisions for payment transactions
//!
//! This library provides the core functionality for the reward decision
//! service. It tiers users into personas, enforces a daily cap on credited
//! value, and answers repeated requests for the same transaction with the
//! stored decision.

pub mod cache;
pub mod config;
pub mod docs;
pub mod engine;
pub mod error;
pub mod middleware;
pub mod policy;
pub mod routes;

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

pub use crate::cache::{select_backend, CacheBackend, InMemoryCache, RedisCache};
pub use crate::config::Config;
pub use crate::engine::{PersonaOverrides, RewardEngine};
pub use crate::policy::{PolicyConfig, PolicyStore};

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    pub cache: Arc<dyn CacheBackend>,
    pub policy: Arc<PolicyStore>,
    pub personas: Arc<PersonaOverrides>,
    pub engine: RewardEngine,
    pub start_time: Instant,
}

impl AppState {
    /// Create a new application state
    ///
    /// Selects the cache backend (Redis when reachable, otherwise the
    /// in-process fallback) and loads the policy and persona overrides.
    pub async fn new(config: Config) -> Self {
        let cache = select_backend(&config).await;
        let policy = Arc::new(PolicyStore::load(config.policy_path.clone()));

        let personas = if config.persona_overrides_enabled {
            info!("Persona overrides enabled");
            Arc::new(PersonaOverrides::enabled(
                config.persona_overrides_path.clone(),
            ))
        } else {
            Arc::new(PersonaOverrides::disabled())
        };

        let engine = RewardEngine::new(cache.clone(), policy.clone(), personas.clone());

        Self {
            config,
            cache,
            policy,
            personas,
            engine,
            start_time: Instant::now(),
        }
    }

    /// Create an application state over explicit collaborators
    ///
    /// Used by integration tests to pin the cache backend and the date.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn new_for_testing(
        config: Config,
        cache: Arc<dyn CacheBackend>,
        policy: PolicyConfig,
        personas: PersonaOverrides,
        clock: Arc<dyn engine::Clock>,
    ) -> Self {
        let policy = Arc::new(PolicyStore::new(policy));
        let personas = Arc::new(personas);
        let engine = RewardEngine::with_clock(cache.clone(), policy.clone(), personas.clone(), clock);

        Self {
            config,
            cache,
            policy,
            personas,
            engine,
            start_time: Instant::now(),
        }
    }

    /// Release the cache backend
    pub async fn shutdown(&self) {
        self.cache.close().await;
    }
}
