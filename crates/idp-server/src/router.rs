//! Router configuration.
//!
//! This module creates the Axum router that serves every IdP endpoint.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Creates the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/metadata", get(handlers::metadata).post(handlers::metadata))
        .route("/sso", get(handlers::sso_redirect).post(handlers::sso_post))
        .route(
            "/login",
            get(handlers::login_page).post(handlers::login_submit),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
