// src/generation/routes.rs

use axum::{routing::post, Router};

use super::handlers;

/// Create the generation router
pub fn generation_routes() -> Router {
    Router::new()
        .route("/api/generate-thumbnail", post(handlers::generate_thumbnail))
        .route("/api/generate-content", post(handlers::generate_content))
        .route("/api/analyze-prompt", post(handlers::analyze_prompt))
        // Unified server-side orchestrator flows
        .route("/api/studio/generate", post(handlers::studio_generate))
        .route(
            "/api/studio/regenerate-image",
            post(handlers::studio_regenerate_image),
        )
        .route(
            "/api/studio/regenerate-content",
            post(handlers::studio_regenerate_content),
        )
}
