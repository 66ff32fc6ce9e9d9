//! Authentication routes

use axum::{routing::get, Router};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `GET /api/me` - Current user with credit summary
/// - `PATCH /api/me` - Update profile full name
pub fn auth_routes() -> Router {
    Router::new().route(
        "/api/me",
        get(handlers::me_handler).patch(handlers::update_profile),
    )
}
