//! OpenAPI specification for the reward API
//!
//! Aggregates all endpoints and schemas into a single OpenAPI document.

use utoipa::OpenApi;

use crate::engine::types::{
    DecisionMeta, DecisionRecord, Persona, ReasonCode, RewardRequest, RewardType, TransactionType,
};
use crate::error::{ErrorBody, ErrorResponse};
use crate::routes::{
    health::{CacheCheck, HealthResponse, HealthStatus, SimpleHealthResponse},
    persona::{MessageResponse, PersonaResponse, SetPersonaRequest},
    policy::PolicyReloadResponse,
};

/// OpenAPI specification for the reward decision service
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Reward Decision API",
        version = "1.0.0",
        description = "Reward decisions for transactions with persona tiering, daily caps and idempotent replays"
    ),
    paths(
        crate::routes::reward::decide_reward,
        crate::routes::persona::set_persona,
        crate::routes::persona::list_personas,
        crate::routes::persona::get_persona,
        crate::routes::persona::remove_persona,
        crate::routes::persona::reload_personas,
        crate::routes::policy::reload_policy,
        crate::routes::health::health_check,
        crate::routes::health::readiness_check,
        crate::routes::health::liveness_check,
    ),
    components(
        schemas(
            // Decision
            RewardRequest,
            TransactionType,
            DecisionRecord,
            DecisionMeta,
            RewardType,
            ReasonCode,
            Persona,
            // Admin
            SetPersonaRequest,
            PersonaResponse,
            MessageResponse,
            PolicyReloadResponse,
            // Health
            HealthStatus,
            CacheCheck,
            HealthResponse,
            SimpleHealthResponse,
            // Error
            ErrorBody,
            ErrorResponse,
        )
    ),
    tags(
        (name = "reward", description = "Reward decisions"),
        (name = "persona", description = "Persona overrides (admin)"),
        (name = "policy", description = "Policy management (admin)"),
        (name = "health", description = "Health probes")
    )
)]
pub struct RewardApiDoc;
