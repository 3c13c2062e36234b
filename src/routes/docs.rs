//! OpenAPI document endpoint

use axum::Json;
use utoipa::OpenApi;

use crate::docs::RewardApiDoc;

/// Handler for the OpenAPI JSON endpoint
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(RewardApiDoc::openapi())
}
