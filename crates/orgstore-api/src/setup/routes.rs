//! Route configuration and setup

use crate::auth::{auth_middleware, JwtValidator};
use crate::constants::{
    HEALTH_PATH, HTTP_CONCURRENCY_LIMIT, MAX_BODY_BYTES, ORGANIZATION_CONTEXT_PATH,
};
use crate::handlers::{health, organization, space};
use crate::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use orgstore_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Router<()> {
    let validator = Arc::new(JwtValidator::new(&config.jwt_secret));

    let public_routes = Router::new()
        .route(HEALTH_PATH, get(health::health_check))
        .with_state(state.clone());

    let protected_routes = context_routes()
        .route_layer(axum::middleware::from_fn_with_state(
            validator,
            auth_middleware,
        ))
        .with_state(state);

    public_routes
        .merge(protected_routes)
        .layer(ConcurrencyLimitLayer::new(HTTP_CONCURRENCY_LIMIT))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}

fn context_routes() -> Router<Arc<AppState>> {
    let base = ORGANIZATION_CONTEXT_PATH;
    Router::new()
        .route(
            &format!("{base}/"),
            post(organization::create_organization_context),
        )
        .route(
            &format!("{base}/{{organization}}"),
            delete(organization::delete_organization_context),
        )
        .route(
            &format!("{base}/{{organization}}/space/"),
            post(space::create_space_context),
        )
        .route(
            &format!("{base}/{{organization}}/space/{{space}}"),
            delete(space::delete_space_context),
        )
}
