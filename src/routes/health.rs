//! Health check endpoints
//!
//! Provides endpoints for monitoring and container orchestration:
//! - `/health` - Full health check with cache backend status
//! - `/health/ready` - Readiness probe
//! - `/health/live` - Liveness probe
//!
//! Decisions keep working while the cache is down (reads miss, writes are
//! dropped), so a failing cache reports `degraded` rather than `unhealthy`.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::cache::BackendKind;
use crate::AppState;

/// Health status enum
#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Cache backend check result
#[derive(Debug, Serialize, ToSchema)]
pub struct CacheCheck {
    #[schema(value_type = String, example = "redis")]
    pub backend: BackendKind,
    pub status: HealthStatus,
    pub latency_ms: u64,
}

/// Full health check response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: String,
    pub policy_version: Option<String>,
    pub cache: CacheCheck,
}

/// Simple health response for liveness/readiness
#[derive(Debug, Serialize, ToSchema)]
pub struct SimpleHealthResponse {
    pub status: HealthStatus,
}

async fn check_cache(state: &AppState) -> CacheCheck {
    let start = Instant::now();
    let reachable = state.cache.ping().await;

    CacheCheck {
        backend: state.cache.kind(),
        status: if reachable {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        },
        latency_ms: start.elapsed().as_millis() as u64,
    }
}

/// Full health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let cache = check_cache(&state).await;

    let response = HealthResponse {
        status: cache.status.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        policy_version: state.policy.current().policy_version.clone(),
        cache,
    };

    (StatusCode::OK, Json(response))
}

/// Readiness probe endpoint
///
/// Ready whenever the selected backend answers a ping.
#[utoipa::path(
    get,
    path = "/health/ready",
    responses(
        (status = 200, description = "Ready for traffic", body = SimpleHealthResponse),
        (status = 503, description = "Cache backend unreachable", body = SimpleHealthResponse)
    ),
    tag = "health"
)]
pub async fn readiness_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<SimpleHealthResponse>) {
    if !state.cache.ping().await {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(SimpleHealthResponse {
                status: HealthStatus::Unhealthy,
            }),
        );
    }

    (
        StatusCode::OK,
        Json(SimpleHealthResponse {
            status: HealthStatus::Healthy,
        }),
    )
}

/// Liveness probe endpoint
#[utoipa::path(
    get,
    path = "/health/live",
    responses(
        (status = 200, description = "Process is alive", body = SimpleHealthResponse)
    ),
    tag = "health"
)]
pub async fn liveness_check() -> (StatusCode, Json<SimpleHealthResponse>) {
    (
        StatusCode::OK,
        Json(SimpleHealthResponse {
            status: HealthStatus::Healthy,
        }),
    )
}
