//! Reward decision endpoint

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::debug;

use crate::{
    engine::types::{DecisionRecord, RewardRequest},
    error::{AppError, AppResult},
    AppState,
};

/// Decide the reward for a transaction
///
/// Replays the stored decision when the same (txn_id, user_id,
/// merchant_id) was decided before. Unparseable bodies, including unknown
/// `txn_type` values, are validation errors.
#[utoipa::path(
    post,
    path = "/reward/decide",
    request_body = RewardRequest,
    responses(
        (status = 200, description = "Reward decided", body = DecisionRecord),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 500, description = "Configuration or processing error", body = crate::error::ErrorResponse)
    ),
    tag = "reward"
)]
pub async fn decide_reward(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RewardRequest>, JsonRejection>,
) -> AppResult<Json<DecisionRecord>> {
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let request = request.validate()?;
    debug!(
        txn_id = %request.txn_id,
        amount = request.amount,
        txn_type = ?request.txn_type,
        "Reward decision requested"
    );

    let record = state.engine.decide(&request).await?;
    Ok(Json(record))
}
