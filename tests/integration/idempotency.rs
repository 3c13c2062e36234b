//! Idempotency integration tests
//!
//! A repeated (txn_id, user_id, merchant_id) triple returns the stored
//! decision and leaves user state untouched.

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use reward_engine::cache::CacheBackend;
use serde_json::{json, Value};

use crate::common::{cashback_policy, reward_request, TestApp};

#[tokio::test]
async fn test_repeat_returns_identical_decision() {
    let app = TestApp::with_policy(cashback_policy());
    let body = reward_request("txn_001", "user_001", 100.0);

    let first = app.decide(&body).await;
    let second = app.decide(&body).await;

    assert_eq!(first, second);
    assert_eq!(app.cached("txn_count:user_001").await, Some(json!(1)));
    assert_eq!(app.cached("cac:user_001:2024-01-15").await, Some(json!(150)));
}

#[tokio::test]
async fn test_repeat_with_different_amount_still_replays() {
    let app = TestApp::with_policy(cashback_policy());

    let first = app.decide(&reward_request("txn_001", "user_001", 100.0)).await;
    let second = app.decide(&reward_request("txn_001", "user_001", 5.0)).await;

    assert_eq!(first["decision_id"], second["decision_id"]);
    assert_eq!(second["reward_value"], 150);
}

#[tokio::test]
async fn test_different_merchant_is_a_new_decision() {
    let app = TestApp::with_policy(cashback_policy());
    let first_body = reward_request("txn_001", "user_001", 100.0);
    let mut second_body = first_body.clone();
    second_body["merchant_id"] = json!("merchant_002");

    let first = app.decide(&first_body).await;
    let second = app.decide(&second_body).await;

    assert_ne!(first["decision_id"], second["decision_id"]);
    assert_eq!(app.cached("txn_count:user_001").await, Some(json!(2)));
}

#[tokio::test]
async fn test_string_encoded_record_is_replayed() {
    let app = TestApp::new();
    let stored = json!({
        "decision_id": "legacy-1",
        "policy_version": "v0",
        "reward_type": "XP",
        "reward_value": 42,
        "xp": 42,
        "reason_codes": ["XP_APPLIED"],
        "meta": {"persona": "RETURNING", "daily_cac_used": 10, "daily_cac_limit": 150}
    });
    app.cache
        .set(
            "idem:txn_001:user_001:merchant_001",
            Value::String(stored.to_string()),
            None,
        )
        .await;

    let response = app
        .server
        .post("/reward/decide")
        .json(&reward_request("txn_001", "user_001", 100.0))
        .await;

    response.assert_status_ok();
    let decision: Value = response.json();
    assert_eq!(decision, stored);
}

#[tokio::test]
async fn test_malformed_stored_record_is_processing_error() {
    let app = TestApp::new();
    app.cache
        .set("idem:txn_001:user_001:merchant_001", json!([1, 2, 3]), None)
        .await;

    let response = app
        .server
        .post("/reward/decide")
        .json(&reward_request("txn_001", "user_001", 100.0))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let error: Value = response.json();
    assert_eq!(error["error"]["code"], "PROCESSING_ERROR");
}
