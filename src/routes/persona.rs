//! Persona override endpoints
//!
//! Mounted only when admin routes are enabled. Overrides pin a user's
//! starting persona for the next decisions; promotion still applies.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    engine::types::Persona,
    error::{AppError, AppResult},
    AppState,
};

/// Body of `POST /persona/mock`
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetPersonaRequest {
    pub user_id: String,
    /// One of `NEW`, `RETURNING`, `POWER`
    pub persona: String,
}

/// Result of a persona override operation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PersonaResponse {
    pub user_id: String,
    pub persona: Option<Persona>,
    pub message: String,
}

/// Generic acknowledgement
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

fn parse_persona(raw: &str) -> AppResult<Persona> {
    Persona::parse(raw).ok_or_else(|| {
        let allowed: Vec<&str> = Persona::ALL.iter().map(Persona::as_str).collect();
        AppError::BadRequest(format!(
            "Invalid persona. Must be one of: {}",
            allowed.join(", ")
        ))
    })
}

/// Pin a user's persona
#[utoipa::path(
    post,
    path = "/persona/mock",
    request_body = SetPersonaRequest,
    responses(
        (status = 200, description = "Override set", body = PersonaResponse),
        (status = 400, description = "Unknown persona or overrides disabled", body = crate::error::ErrorResponse)
    ),
    tag = "persona"
)]
pub async fn set_persona(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetPersonaRequest>,
) -> AppResult<Json<PersonaResponse>> {
    if !state.personas.is_enabled() {
        return Err(AppError::BadRequest(
            "Persona overrides are disabled".to_string(),
        ));
    }
    let persona = parse_persona(&body.persona)?;
    state.personas.set(&body.user_id, persona);

    info!(user_id = %body.user_id, persona = %persona, "Persona override set via API");
    Ok(Json(PersonaResponse {
        message: format!("Persona set to {} for user {}", persona, body.user_id),
        user_id: body.user_id,
        persona: Some(persona),
    }))
}

/// Remove a user's in-memory override
#[utoipa::path(
    delete,
    path = "/persona/mock/{user_id}",
    params(("user_id" = String, Path, description = "User identifier")),
    responses(
        (status = 200, description = "Override removed", body = PersonaResponse),
        (status = 404, description = "No override for user", body = crate::error::ErrorResponse)
    ),
    tag = "persona"
)]
pub async fn remove_persona(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<PersonaResponse>> {
    if !state.personas.remove(&user_id) {
        return Err(AppError::NotFound(format!(
            "No mocked persona found for user {}",
            user_id
        )));
    }

    Ok(Json(PersonaResponse {
        message: format!("Persona mock removed for user {}", user_id),
        user_id,
        persona: None,
    }))
}

/// Current override for a user
#[utoipa::path(
    get,
    path = "/persona/mock/{user_id}",
    params(("user_id" = String, Path, description = "User identifier")),
    responses(
        (status = 200, description = "Override found", body = PersonaResponse),
        (status = 404, description = "No override for user", body = crate::error::ErrorResponse)
    ),
    tag = "persona"
)]
pub async fn get_persona(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<PersonaResponse>> {
    let persona = state.personas.get(&user_id).ok_or_else(|| {
        AppError::NotFound(format!("No mocked persona found for user {}", user_id))
    })?;

    Ok(Json(PersonaResponse {
        message: format!("Mocked persona: {}", persona),
        user_id,
        persona: Some(persona),
    }))
}

/// Every override, in-memory entries winning over file entries
#[utoipa::path(
    get,
    path = "/persona/mock",
    responses(
        (status = 200, description = "All overrides", body = HashMap<String, Persona>)
    ),
    tag = "persona"
)]
pub async fn list_personas(State(state): State<Arc<AppState>>) -> Json<HashMap<String, Persona>> {
    Json(state.personas.all())
}

/// Re-read the overrides file
#[utoipa::path(
    post,
    path = "/persona/reload-json",
    responses(
        (status = 200, description = "File reloaded", body = MessageResponse)
    ),
    tag = "persona"
)]
pub async fn reload_personas(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    state.personas.reload_file();
    Json(MessageResponse {
        message: "Persona JSON file reloaded successfully".to_string(),
    })
}
