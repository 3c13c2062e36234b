//! HTTP routes for the reward engine
//!
//! This module defines all HTTP endpoints exposed by the service.

pub mod docs;
pub mod health;
pub mod metrics;
pub mod persona;
pub mod policy;
pub mod reward;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::HeaderName,
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    middleware::{request_id_middleware, timing_middleware, PROCESS_TIME_HEADER, REQUEST_ID_HEADER},
    AppState,
};

/// Upper bound on handling one request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            HeaderName::from_static(REQUEST_ID_HEADER),
            HeaderName::from_static(PROCESS_TIME_HEADER),
        ]);

    let public_routes = Router::new()
        .route("/reward/decide", post(reward::decide_reward))
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/health/live", get(health::liveness_check))
        .route("/metrics", get(metrics::prometheus_metrics))
        .route("/docs/openapi.json", get(docs::openapi_json));

    let mut router = Router::new().merge(public_routes);
    if state.config.admin_enabled {
        router = router.merge(admin_routes());
    }

    // Each router-level layer wraps everything added before it, so cors ends
    // up outermost. Inside the ServiceBuilder the order is outermost first.
    router
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(middleware::from_fn(timing_middleware))
                .layer(TimeoutLayer::new(REQUEST_TIMEOUT)),
        )
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Persona override and policy reload endpoints
fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/persona/mock",
            post(persona::set_persona).get(persona::list_personas),
        )
        .route(
            "/persona/mock/:user_id",
            get(persona::get_persona).delete(persona::remove_persona),
        )
        .route("/persona/reload-json", post(persona::reload_personas))
        .route("/policy/reload", post(policy::reload_policy))
}
