//! Decision endpoint integration tests
//!
//! Tests for `POST /reward/decide`: reward selection, error mapping and
//! response headers.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use pretty_assertions::assert_eq;
use reward_engine::cache::CacheBackend;
use serde_json::{json, Value};

use crate::common::{cashback_policy, constants, reward_request, with_flags, TestApp};

#[tokio::test]
async fn test_first_transaction_grants_cashback() {
    let app = TestApp::with_policy(cashback_policy());

    let decision = app.decide(&reward_request("txn_001", "user_001", 100.0)).await;

    assert_eq!(decision["reward_type"], "CHECKOUT");
    assert_eq!(decision["reward_value"], 150);
    assert_eq!(decision["xp"], 150);
    assert_eq!(decision["reason_codes"], json!(["CASHBACK_GRANTED"]));
    assert_eq!(decision["policy_version"], "v1");
    assert_eq!(
        decision["meta"],
        json!({"persona": "NEW", "daily_cac_used": 0, "daily_cac_limit": 200})
    );
    assert!(decision["decision_id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn test_default_policy_prefers_xp() {
    let app = TestApp::new();

    let decision = app.decide(&reward_request("txn_001", "user_001", 100.0)).await;

    assert_eq!(decision["reward_type"], "XP");
    assert_eq!(decision["reward_value"], 150);
    assert_eq!(decision["reason_codes"], json!(["XP_APPLIED"]));
}

#[tokio::test]
async fn test_xp_is_capped_per_transaction() {
    let app = TestApp::new();

    let decision = app
        .decide(&reward_request("txn_001", "user_001", 999_999.0))
        .await;

    assert_eq!(decision["xp"], 500);
}

#[tokio::test]
async fn test_power_user_gets_gold_when_preferred() {
    let app = TestApp::with_policy(with_flags(false, true));
    app.cache
        .set("persona:user_001", json!("POWER"), None)
        .await;

    let decision = app.decide(&reward_request("txn_001", "user_001", 1000.0)).await;

    assert_eq!(decision["reward_type"], "GOLD");
    assert_eq!(decision["reward_value"], 50);
    assert_eq!(decision["reason_codes"], json!(["GOLD_GRANTED"]));
    assert_eq!(decision["meta"]["persona"], "POWER");
}

#[tokio::test]
async fn test_identifiers_are_trimmed() {
    let app = TestApp::with_policy(cashback_policy());
    let mut body = reward_request("  txn_001  ", "  user_001  ", 100.0);
    body["merchant_id"] = json!(format!("  {}  ", constants::TEST_MERCHANT_ID));

    app.decide(&body).await;

    assert_eq!(app.cached("txn_count:user_001").await, Some(json!(1)));
}

async fn assert_validation_error(app: &TestApp, body: Value) {
    let response = app.server.post("/reward/decide").json(&body).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let error: Value = response.json();
    assert_eq!(error["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_rejects_invalid_amounts() {
    let app = TestApp::new();

    assert_validation_error(&app, reward_request("t", "u", 0.0)).await;
    assert_validation_error(&app, reward_request("t", "u", -50.0)).await;
    assert_validation_error(&app, reward_request("t", "u", 10_000_000.0)).await;
}

#[tokio::test]
async fn test_rejects_empty_identifiers() {
    let app = TestApp::new();

    assert_validation_error(&app, reward_request("txn_001", "   ", 100.0)).await;
    assert_validation_error(&app, reward_request("", "user_001", 100.0)).await;
}

#[tokio::test]
async fn test_rejects_unknown_transaction_type() {
    let app = TestApp::new();
    let mut body = reward_request("txn_001", "user_001", 100.0);
    body["txn_type"] = json!("INVALID_TYPE");

    assert_validation_error(&app, body).await;
}

#[tokio::test]
async fn test_rejects_missing_fields() {
    let app = TestApp::new();

    assert_validation_error(&app, json!({"txn_id": "txn_001", "amount": 100.0})).await;
}

#[tokio::test]
async fn test_missing_policy_key_is_config_error() {
    let mut policy = cashback_policy();
    policy.feature_flags = None;
    let app = TestApp::with_policy(policy);

    let response = app
        .server
        .post("/reward/decide")
        .json(&reward_request("txn_001", "user_001", 100.0))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let error: Value = response.json();
    assert_eq!(error["error"]["code"], "CONFIG_ERROR");
    assert!(error["error"]["message"]
        .as_str()
        .unwrap()
        .contains("feature_flags"));
}

#[tokio::test]
async fn test_response_carries_request_id_and_timing() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/reward/decide")
        .json(&reward_request("txn_001", "user_001", 100.0))
        .await;

    response.assert_status_ok();
    let request_id = response.header("x-request-id");
    assert!(uuid::Uuid::parse_str(request_id.to_str().unwrap()).is_ok());
    let process_time = response.header("x-process-time");
    assert!(process_time.to_str().unwrap().parse::<f64>().is_ok());
}

#[tokio::test]
async fn test_cross_origin_response_is_compressed_and_exposes_headers() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/reward/decide")
        .add_header(
            HeaderName::from_static("origin"),
            HeaderValue::from_static("https://merchant.example"),
        )
        .add_header(
            HeaderName::from_static("accept-encoding"),
            HeaderValue::from_static("gzip"),
        )
        .json(&reward_request("txn_001", "user_001", 100.0))
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("access-control-allow-origin"), "*");
    let exposed = response.header("access-control-expose-headers");
    let exposed = exposed.to_str().unwrap();
    assert!(exposed.contains("x-request-id"));
    assert!(exposed.contains("x-process-time"));
    assert_eq!(response.header("content-encoding"), "gzip");
    assert!(response.maybe_header("x-request-id").is_some());
}
