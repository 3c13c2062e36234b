//! Persona integration tests
//!
//! Promotion across a user's decision history, and the admin override and
//! policy reload endpoints.

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use reward_engine::cache::CacheBackend;
use serde_json::{json, Value};

use crate::common::{cashback_policy, reward_request, with_flags, TestApp};

#[tokio::test]
async fn test_persona_promotes_with_history() {
    let app = TestApp::new();

    let mut personas = Vec::new();
    for i in 1..=10 {
        let decision = app
            .decide(&reward_request(&format!("txn_{:03}", i), "user_001", 10.0))
            .await;
        personas.push(decision["meta"]["persona"].as_str().unwrap().to_string());
    }

    assert_eq!(personas[0], "NEW");
    assert_eq!(personas[1], "NEW");
    assert_eq!(personas[2], "RETURNING");
    assert_eq!(personas[8], "RETURNING");
    assert_eq!(personas[9], "POWER");
    assert_eq!(app.cached("persona:user_001").await, Some(json!("POWER")));
    assert_eq!(app.cached("txn_count:user_001").await, Some(json!(10)));
}

#[tokio::test]
async fn test_unknown_cached_persona_is_new() {
    let app = TestApp::new();
    app.cache
        .set("persona:user_001", json!("INVALID_PERSONA"), None)
        .await;

    let decision = app.decide(&reward_request("txn_001", "user_001", 100.0)).await;

    assert_eq!(decision["meta"]["persona"], "NEW");
}

#[tokio::test]
async fn test_admin_routes_hidden_when_disabled() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/persona/mock")
        .json(&json!({"user_id": "user_001", "persona": "POWER"}))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    app.server
        .post("/policy/reload")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_override_lifecycle() {
    let app = TestApp::with_admin(cashback_policy());

    let set = app
        .server
        .post("/persona/mock")
        .json(&json!({"user_id": "user_001", "persona": "POWER"}))
        .await;
    set.assert_status_ok();
    let body: Value = set.json();
    assert_eq!(body["persona"], "POWER");

    let fetched: Value = app.server.get("/persona/mock/user_001").await.json();
    assert_eq!(fetched["persona"], "POWER");

    let all: Value = app.server.get("/persona/mock").await.json();
    assert_eq!(all, json!({"user_001": "POWER"}));

    let removed = app.server.delete("/persona/mock/user_001").await;
    removed.assert_status_ok();
    let body: Value = removed.json();
    assert_eq!(body["persona"], Value::Null);

    app.server
        .get("/persona/mock/user_001")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.server
        .delete("/persona/mock/user_001")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_override_rejects_unknown_persona() {
    let app = TestApp::with_admin(cashback_policy());

    let response = app
        .server
        .post("/persona/mock")
        .json(&json!({"user_id": "user_001", "persona": "VIP"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let error: Value = response.json();
    assert_eq!(error["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_override_drives_decision() {
    let app = TestApp::with_admin(with_flags(false, true));
    app.server
        .post("/persona/mock")
        .json(&json!({"user_id": "user_001", "persona": "POWER"}))
        .await
        .assert_status_ok();

    let decision = app.decide(&reward_request("txn_001", "user_001", 100.0)).await;

    assert_eq!(decision["meta"]["persona"], "POWER");
    assert_eq!(decision["reward_type"], "GOLD");
    assert_eq!(app.cached("persona:user_001").await, Some(json!("POWER")));
}

#[tokio::test]
async fn test_reload_json_without_file_succeeds() {
    let app = TestApp::with_admin(cashback_policy());

    let response = app.server.post("/persona/reload-json").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "Persona JSON file reloaded successfully");
}

#[tokio::test]
async fn test_policy_reload_without_file_keeps_current_policy() {
    let app = TestApp::with_admin(cashback_policy());

    let response = app.server.post("/policy/reload").await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let error: Value = response.json();
    assert_eq!(error["error"]["code"], "CONFIG_ERROR");

    let decision = app.decide(&reward_request("txn_001", "user_001", 100.0)).await;
    assert_eq!(decision["reward_type"], "CHECKOUT");
}
