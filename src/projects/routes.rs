// src/projects/routes.rs

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Create the projects router
pub fn projects_routes() -> Router {
    Router::new()
        .route("/api/save-project", post(handlers::save_project))
        .route(
            "/api/update-project-thumbnail",
            post(handlers::update_project_thumbnail),
        )
        .route(
            "/api/update-project-content",
            post(handlers::update_project_content),
        )
        .route("/api/projects", get(handlers::list_projects))
}
