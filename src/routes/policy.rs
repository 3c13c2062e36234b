//! Policy reload endpoint

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{error::AppResult, AppState};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PolicyReloadResponse {
    pub policy_version: Option<String>,
    pub message: String,
}

/// Re-read the policy file and swap it in
///
/// The previous policy stays active when the file cannot be loaded.
#[utoipa::path(
    post,
    path = "/policy/reload",
    responses(
        (status = 200, description = "Policy reloaded", body = PolicyReloadResponse),
        (status = 500, description = "Policy file missing or invalid", body = crate::error::ErrorResponse)
    ),
    tag = "policy"
)]
pub async fn reload_policy(State(state): State<Arc<AppState>>) -> AppResult<Json<PolicyReloadResponse>> {
    let policy = state.policy.reload()?;
    Ok(Json(PolicyReloadResponse {
        policy_version: policy.policy_version.clone(),
        message: "Policy reloaded".to_string(),
    }))
}
