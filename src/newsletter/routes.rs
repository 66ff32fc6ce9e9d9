// src/newsletter/routes.rs

use axum::{routing::post, Router};

use super::handlers;

/// Create the newsletter router
pub fn newsletter_routes() -> Router {
    Router::new().route("/api/newsletter", post(handlers::subscribe))
}
