//! Health, metrics and docs endpoint integration tests
//!
//! Tests for the operational endpoints:
//! - GET /health - Full health check with cache backend status
//! - GET /health/ready - Readiness probe
//! - GET /health/live - Liveness probe
//! - GET /metrics - Prometheus metrics
//! - GET /docs/openapi.json - OpenAPI document

use axum::http::StatusCode;
use reward_engine::cache::CacheBackend;
use serde_json::Value;

use crate::common::TestApp;

#[tokio::test]
async fn test_health_reports_memory_backend() {
    let app = TestApp::new();

    let response = app.server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["cache"]["backend"], "memory");
    assert_eq!(body["cache"]["status"], "healthy");
    assert_eq!(body["policy_version"], "v1");
    assert!(body["version"].is_string());
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn test_readiness_probe() {
    let app = TestApp::new();

    let response = app.server.get("/health/ready").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_liveness_probe_survives_closed_cache() {
    let app = TestApp::new();
    app.cache.close().await;

    app.server.get("/health/live").await.assert_status_ok();
}

#[tokio::test]
async fn test_metrics_endpoint() {
    reward_engine::routes::metrics::init_metrics();
    let app = TestApp::new();

    let response = app.server.get("/metrics").await;

    response.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_openapi_document() {
    let app = TestApp::new();

    let response = app.server.get("/docs/openapi.json").await;

    response.assert_status_ok();
    let doc: Value = response.json();
    assert_eq!(doc["info"]["title"], "Reward Decision API");
    assert!(doc["paths"]["/reward/decide"]["post"].is_object());
    assert!(doc["components"]["schemas"]["DecisionRecord"].is_object());
}
