//! API route configuration.

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::handlers;
use crate::state::AppState;

/// Creates the API router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))

        // Users
        .route("/api/v1/users", get(handlers::list_users).post(handlers::register_user))
        .route("/api/v1/users/stats", get(handlers::get_user_stats))
        .route(
            "/api/v1/users/:user_key",
            get(handlers::get_user).delete(handlers::delete_user),
        )

        .with_state(state)
}
