//! Common test utilities for the reward engine
//!
//! Builds the full router over an in-memory cache with a fixed clock, and
//! provides request fixtures and helpers for waiting on background writes.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use chrono::NaiveDate;
use serde_json::{json, Value};

use reward_engine::{
    cache::{keys, CacheBackend, InMemoryCache},
    config::Config,
    engine::{FixedClock, PersonaOverrides},
    policy::PolicyConfig,
    routes::create_router,
    AppState,
};

/// Test configuration constants
pub mod constants {
    pub const TEST_USER_ID: &str = "user_001";
    pub const TEST_MERCHANT_ID: &str = "merchant_001";
    /// Date the fixed clock starts on
    pub const TEST_DAY: &str = "2024-01-15";
}

/// Process configuration for tests; Redis is never contacted
pub fn test_config(admin_enabled: bool) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        redis_url: "redis://127.0.0.1:1".to_string(),
        redis_connect_timeout: Duration::from_millis(100),
        redis_socket_timeout: Duration::from_millis(100),
        redis_health_check_interval: Duration::from_secs(30),
        redis_max_consecutive_errors: 3,
        memory_cache_max_entries: None,
        policy_path: None,
        persona_overrides_enabled: admin_enabled,
        persona_overrides_path: None,
        admin_enabled,
    }
}

/// Default policy with cashback selection (neither preference flag set)
pub fn cashback_policy() -> PolicyConfig {
    with_flags(false, false)
}

/// Default policy with the given preference flags
pub fn with_flags(prefer_xp: bool, prefer_gold: bool) -> PolicyConfig {
    let mut policy = PolicyConfig::default();
    if let Some(flags) = policy.feature_flags.as_mut() {
        flags.prefer_xp = prefer_xp;
        flags.prefer_gold = prefer_gold;
    }
    policy
}

/// A request body for `POST /reward/decide`
pub fn reward_request(txn_id: &str, user_id: &str, amount: f64) -> Value {
    json!({
        "txn_id": txn_id,
        "user_id": user_id,
        "merchant_id": constants::TEST_MERCHANT_ID,
        "amount": amount,
        "txn_type": "PAYMENT",
        "ts": "2024-01-15T10:00:00Z"
    })
}

/// Router plus handles on the collaborators behind it
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub cache: Arc<InMemoryCache>,
    pub clock: Arc<FixedClock>,
}

impl TestApp {
    /// App on the default policy, admin routes disabled
    pub fn new() -> Self {
        Self::build(PolicyConfig::default(), false)
    }

    pub fn with_policy(policy: PolicyConfig) -> Self {
        Self::build(policy, false)
    }

    /// App with admin routes and persona overrides enabled
    pub fn with_admin(policy: PolicyConfig) -> Self {
        Self::build(policy, true)
    }

    fn build(policy: PolicyConfig, admin_enabled: bool) -> Self {
        let cache = Arc::new(InMemoryCache::new(None));
        let clock = Arc::new(FixedClock::new(
            NaiveDate::parse_from_str(constants::TEST_DAY, "%Y-%m-%d").unwrap(),
        ));
        let personas = if admin_enabled {
            PersonaOverrides::enabled(None)
        } else {
            PersonaOverrides::disabled()
        };

        let state = Arc::new(AppState::new_for_testing(
            test_config(admin_enabled),
            cache.clone(),
            policy,
            personas,
            clock.clone(),
        ));
        let server = TestServer::new(create_router(state.clone())).unwrap();

        Self {
            server,
            state,
            cache,
            clock,
        }
    }

    /// Post a decision request and wait for its background writes
    pub async fn decide(&self, body: &Value) -> Value {
        let response = self.server.post("/reward/decide").json(body).await;
        response.assert_status_ok();
        let decision: Value = response.json();

        let key = keys::idempotency(
            body["txn_id"].as_str().unwrap().trim(),
            body["user_id"].as_str().unwrap().trim(),
            body["merchant_id"].as_str().unwrap().trim(),
        );
        self.wait_for_key(&key).await;
        decision
    }

    /// Poll the cache until `key` is present (up to one second)
    ///
    /// Background writes run on the test runtime, so by the time one of a
    /// decision's writes is visible the others have run too.
    pub async fn wait_for_key(&self, key: &str) {
        for _ in 0..100 {
            if self.cache.get(key).await.is_some() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("cache key {} was never written", key);
    }

    pub async fn cached(&self, key: &str) -> Option<Value> {
        self.cache.get(key).await
    }
}
