// src/projects/handlers.rs
//! Project persistence handlers

use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::models::{ContentPatch, NewProject, Project};
use super::store;
use super::validators::{sanitize_content_fields, SaveProjectValidator};
use crate::auth::AuthedUser;
use crate::common::Validator;
use crate::common::sanitize::sanitize_image_url;
use crate::common::{ApiError, AppState};
use crate::generation::prompts::StyleId;

pub const MAX_IMAGE_URL_LEN: usize = 4_000_000; // generous cap for data URLs

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SaveProjectRequest {
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(rename = "selectedStyleId")]
    pub selected_style_id: String,
    #[serde(rename = "generatedTitle")]
    pub generated_title: Option<String>,
    #[serde(rename = "generatedDescription")]
    pub generated_description: Option<String>,
    #[serde(rename = "generatedTags")]
    pub generated_tags: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SaveProjectResponse {
    pub success: bool,
    #[serde(rename = "projectId")]
    pub project_id: String,
    #[serde(rename = "thumbnailUrl")]
    pub thumbnail_url: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateThumbnailRequest {
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(rename = "selectedStyleId")]
    pub selected_style_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateContentRequest {
    #[serde(rename = "selectedStyleId")]
    pub selected_style_id: String,
    #[serde(rename = "generatedTitle")]
    pub generated_title: Option<String>,
    #[serde(rename = "generatedDescription")]
    pub generated_description: Option<String>,
    #[serde(rename = "generatedTags")]
    pub generated_tags: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateProjectResponse {
    pub success: bool,
    pub data: Project,
}

#[derive(Debug, Serialize)]
pub struct ProjectListResponse {
    pub projects: Vec<Project>,
}

// ============================================================================
// Handlers
// ============================================================================

fn parse_style(style_id: &str) -> Result<StyleId, ApiError> {
    StyleId::from_str(style_id)
        .ok_or_else(|| ApiError::ValidationError(format!("invalid style: {}", style_id)))
}

fn require_image_url(image_url: Option<&str>) -> Result<String, ApiError> {
    let raw = image_url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("imageUrl is required".to_string()))?;

    sanitize_image_url(raw, MAX_IMAGE_URL_LEN)
        .ok_or_else(|| ApiError::ValidationError("imageUrl is not a valid image URL".to_string()))
}

/// Save a completed generation as a new project row
/// POST /api/save-project
pub async fn save_project(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Json(req): Json<SaveProjectRequest>,
) -> Result<Json<SaveProjectResponse>, ApiError> {
    let validation = SaveProjectValidator.validate(&req);
    if !validation.is_valid {
        return Err(validation.into());
    }

    let style = parse_style(&req.selected_style_id)?;
    let image_url = require_image_url(req.image_url.as_deref())?;
    let (title, description, tags) = sanitize_content_fields(
        req.generated_title.as_deref(),
        req.generated_description.as_deref(),
        req.generated_tags.as_deref(),
    );

    let db = state_lock.read().await.db.clone();

    let project = store::insert_project(
        &db,
        &user.id,
        &NewProject {
            selected_style_id: style.as_str().to_string(),
            thumbnail_storage_path: image_url,
            generated_yt_title: title,
            generated_yt_description: description,
            generated_yt_tags: tags,
        },
    )
    .await?;

    info!(user_id = %user.id, project_id = %project.id, style = style.as_str(), "Project saved");

    Ok(Json(SaveProjectResponse {
        success: true,
        project_id: project.id,
        thumbnail_url: project.thumbnail_storage_path,
    }))
}

/// Replace only the thumbnail of the latest project for a style
/// POST /api/update-project-thumbnail
pub async fn update_project_thumbnail(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Json(req): Json<UpdateThumbnailRequest>,
) -> Result<Json<UpdateProjectResponse>, ApiError> {
    let style = parse_style(&req.selected_style_id)?;
    let image_url = require_image_url(req.image_url.as_deref())?;

    let db = state_lock.read().await.db.clone();

    let updated = store::update_thumbnail(&db, &user.id, style.as_str(), &image_url)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("no project found for style {}", style.as_str()))
        })?;

    info!(user_id = %user.id, project_id = %updated.id, "Project thumbnail updated");

    Ok(Json(UpdateProjectResponse {
        success: true,
        data: updated,
    }))
}

/// Partially update the generated text of the latest project for a style
/// POST /api/update-project-content
pub async fn update_project_content(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Json(req): Json<UpdateContentRequest>,
) -> Result<Json<UpdateProjectResponse>, ApiError> {
    let style = parse_style(&req.selected_style_id)?;
    let (title, description, tags) = sanitize_content_fields(
        req.generated_title.as_deref(),
        req.generated_description.as_deref(),
        req.generated_tags.as_deref(),
    );

    let patch = ContentPatch {
        generated_yt_title: title,
        generated_yt_description: description,
        generated_yt_tags: tags,
    };

    if patch.is_empty() {
        return Err(ApiError::BadRequest(
            "at least one content field is required".to_string(),
        ));
    }

    let db = state_lock.read().await.db.clone();

    let updated = store::update_content(&db, &user.id, style.as_str(), &patch)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("no project found for style {}", style.as_str()))
        })?;

    info!(user_id = %user.id, project_id = %updated.id, "Project content updated");

    Ok(Json(UpdateProjectResponse {
        success: true,
        data: updated,
    }))
}

/// List the user's projects, newest first
/// GET /api/projects
pub async fn list_projects(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
) -> Result<Json<ProjectListResponse>, ApiError> {
    let db = state_lock.read().await.db.clone();
    let projects = store::list_projects(&db, &user.id).await?;
    Ok(Json(ProjectListResponse { projects }))
}
