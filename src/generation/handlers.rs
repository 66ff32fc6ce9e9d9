// src/generation/handlers.rs
//! Generation endpoints: thumbnail, content, prompt analysis, and the
//! unified studio flows.

use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::models::{fallback_content, ContentKind, GeneratedContent};
use super::orchestrator::{
    RegenerateContentOutcome, SubmitOutcome, SubmitRequest,
};
use super::prompts::{extract_themes, OverlayStyle, PromptAnalyzer, StyleId, TextOverlay};
use crate::auth::AuthedUser;
use crate::common::sanitize::sanitize_text;
use crate::common::{ApiError, AppState};
use crate::projects::models::Project;
use crate::services::gemini::GeminiError;

pub const MAX_DESCRIPTION_LEN: usize = 2_000;
pub const MAX_PROMPT_LEN: usize = 4_000;
pub const MAX_OVERLAY_TEXT_LEN: usize = 80;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GenerateThumbnailRequest {
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateThumbnailResponse {
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentRequest {
    #[serde(rename = "videoDescription")]
    pub video_description: Option<String>,
    pub style: Option<String>,
    #[serde(rename = "contentType")]
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateContentResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub titles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(rename = "bestTitle", skip_serializing_if = "Option::is_none")]
    pub best_title: Option<String>,
    #[serde(rename = "bestDescription", skip_serializing_if = "Option::is_none")]
    pub best_description: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzePromptRequest {
    pub description: Option<String>,
    pub style: Option<String>,
    pub themes: Option<serde_json::Value>,
    #[serde(rename = "aiChatInput")]
    pub ai_chat_input: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzePromptResponse {
    #[serde(rename = "structuredPrompt")]
    pub structured_prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StudioGenerateRequest {
    pub description: Option<String>,
    pub style: Option<String>,
    #[serde(rename = "overlayText")]
    pub overlay_text: Option<String>,
    #[serde(rename = "overlayStyle")]
    pub overlay_style: Option<String>,
    #[serde(rename = "aiChatInput")]
    pub ai_chat_input: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StudioRegenerateContentRequest {
    pub description: Option<String>,
    pub style: Option<String>,
    #[serde(rename = "contentType")]
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StudioGenerateResponse {
    pub success: bool,
    #[serde(rename = "projectId")]
    pub project_id: Option<String>,
    #[serde(rename = "thumbnailUrl")]
    pub thumbnail_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(rename = "contentFallback", skip_serializing_if = "std::ops::Not::not")]
    pub content_fallback: bool,
    #[serde(rename = "saveFailed", skip_serializing_if = "std::ops::Not::not")]
    pub save_failed: bool,
    pub balance: i64,
}

#[derive(Debug, Serialize)]
pub struct StudioRegenerateContentResponse {
    pub success: bool,
    pub data: Project,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub titles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
}

// ============================================================================
// Shared parsing
// ============================================================================

fn parse_style(style: Option<&str>) -> Result<StyleId, ApiError> {
    let style = style
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::ValidationError("style is required".to_string()))?;
    StyleId::from_str(style)
        .ok_or_else(|| ApiError::ValidationError(format!("invalid style: {}", style)))
}

fn require_description(description: Option<&str>) -> Result<String, ApiError> {
    let cleaned = sanitize_text(description.unwrap_or_default(), MAX_DESCRIPTION_LEN);
    if cleaned.is_empty() {
        return Err(ApiError::ValidationError(
            "videoDescription is required".to_string(),
        ));
    }
    Ok(cleaned)
}

/// Overlay text and style travel as separate optional fields; the overlay
/// only exists when both are present and valid.
fn parse_overlay(
    text: Option<&str>,
    style: Option<&str>,
) -> Result<Option<TextOverlay>, ApiError> {
    let text = text
        .map(|t| sanitize_text(t, MAX_OVERLAY_TEXT_LEN))
        .filter(|t| !t.is_empty());
    let style = style.map(str::trim).filter(|s| !s.is_empty());

    match (text, style) {
        (Some(text), Some(style)) => {
            let style = OverlayStyle::from_str(style).ok_or_else(|| {
                ApiError::ValidationError(format!("invalid overlayStyle: {}", style))
            })?;
            Ok(Some(TextOverlay { text, style }))
        }
        _ => Ok(None),
    }
}

fn content_response(content: GeneratedContent, fallback: bool) -> GenerateContentResponse {
    GenerateContentResponse {
        success: true,
        best_title: content.best_title().map(String::from),
        best_description: content.best_description().map(String::from),
        titles: (!content.titles.is_empty()).then_some(content.titles),
        descriptions: (!content.descriptions.is_empty()).then_some(content.descriptions),
        tags: content.tags,
        fallback,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Generate a thumbnail for an already-built prompt
/// POST /api/generate-thumbnail
pub async fn generate_thumbnail(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Json(req): Json<GenerateThumbnailRequest>,
) -> Result<Json<GenerateThumbnailResponse>, ApiError> {
    let prompt = sanitize_text(req.prompt.as_deref().unwrap_or_default(), MAX_PROMPT_LEN);
    if prompt.is_empty() {
        return Err(ApiError::BadRequest("prompt is required".to_string()));
    }

    let state = state_lock.read().await.clone();

    info!(user_id = %user.id, prompt_chars = prompt.len(), "Thumbnail generation requested");

    match state.orchestrator.charged_thumbnail(&user.id, &prompt).await? {
        Ok(image_url) => Ok(Json(GenerateThumbnailResponse { image_url })),
        Err(SubmitOutcome::InsufficientCredits) => Err(ApiError::InsufficientCredits),
        Err(SubmitOutcome::ThumbnailFailed {
            kind,
            message,
            credit_refunded,
        }) => Err(ApiError::Generation {
            kind,
            message,
            credit_refunded,
        }),
        Err(_) => Err(ApiError::InternalServer("unexpected outcome".to_string())),
    }
}

/// Generate titles/descriptions/tags for a video description
/// POST /api/generate-content
pub async fn generate_content(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Json(req): Json<GenerateContentRequest>,
) -> Result<Json<GenerateContentResponse>, ApiError> {
    let description = require_description(req.video_description.as_deref())?;
    let style = parse_style(req.style.as_deref())?;

    let kind = match req.content_type.as_deref() {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(ContentKind::from_str(raw).ok_or_else(|| {
            ApiError::ValidationError(format!("invalid contentType: {}", raw))
        })?),
    };

    let state = state_lock.read().await.clone();

    match state.gemini.generate_video_content(&description, style, kind).await {
        Ok(content) => {
            info!(user_id = %user.id, style = style.as_str(), "Content generated");
            Ok(Json(content_response(content, false)))
        }
        // No provider key: synthesize locally instead of failing.
        Err(GeminiError::NotConfigured) => {
            warn!("Gemini not configured, synthesizing content locally");
            Ok(Json(content_response(fallback_content(&description), true)))
        }
        Err(e) => Err(ApiError::ServiceUnavailable(format!(
            "content generation failed: {}",
            e
        ))),
    }
}

/// Build a structured thumbnail prompt via the analyzer
/// POST /api/analyze-prompt
pub async fn analyze_prompt(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Json(req): Json<AnalyzePromptRequest>,
) -> Result<Json<AnalyzePromptResponse>, ApiError> {
    let description = require_description(req.description.as_deref())?;
    let style = parse_style(req.style.as_deref())?;

    // Client-supplied themes are advisory; reject malformed shapes but
    // extract our own profile from the description either way.
    if let Some(themes) = &req.themes {
        if !themes.is_object() {
            return Err(ApiError::ValidationError(
                "themes must be an object".to_string(),
            ));
        }
    }

    let state = state_lock.read().await.clone();

    if !state.features.gemini {
        return Ok(Json(AnalyzePromptResponse {
            structured_prompt: None,
        }));
    }

    let themes = extract_themes(&description);
    let structured = state
        .gemini
        .structured_prompt(&description, style, &themes, req.ai_chat_input.as_deref())
        .await
        .map_err(|e| {
            warn!(user_id = %user.id, error = %e, "Prompt analysis failed");
            ApiError::ServiceUnavailable(format!("prompt analysis failed: {}", e))
        })?;

    Ok(Json(AnalyzePromptResponse {
        structured_prompt: Some(structured),
    }))
}

/// Run the full generation flow server-side
/// POST /api/studio/generate
pub async fn studio_generate(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Json(req): Json<StudioGenerateRequest>,
) -> Result<Json<StudioGenerateResponse>, ApiError> {
    let submit = SubmitRequest {
        description: require_description(req.description.as_deref())?,
        style: parse_style(req.style.as_deref())?,
        overlay: parse_overlay(req.overlay_text.as_deref(), req.overlay_style.as_deref())?,
        ai_chat_input: req.ai_chat_input.clone(),
    };

    let state = state_lock.read().await.clone();

    let outcome = state
        .orchestrator
        .submit(&user.id, &submit, &super::orchestrator::NullProgress)
        .await?;

    submit_outcome_to_response(outcome, &state, &user.id).await
}

/// Regenerate only the thumbnail for an existing project
/// POST /api/studio/regenerate-image
pub async fn studio_regenerate_image(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Json(req): Json<StudioGenerateRequest>,
) -> Result<Json<StudioGenerateResponse>, ApiError> {
    let submit = SubmitRequest {
        description: require_description(req.description.as_deref())?,
        style: parse_style(req.style.as_deref())?,
        overlay: parse_overlay(req.overlay_text.as_deref(), req.overlay_style.as_deref())?,
        ai_chat_input: req.ai_chat_input.clone(),
    };

    let state = state_lock.read().await.clone();

    let outcome = state
        .orchestrator
        .regenerate_image(&user.id, &submit, &super::orchestrator::NullProgress)
        .await?;

    submit_outcome_to_response(outcome, &state, &user.id).await
}

/// Regenerate one content field of an existing project
/// POST /api/studio/regenerate-content
pub async fn studio_regenerate_content(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Json(req): Json<StudioRegenerateContentRequest>,
) -> Result<Json<StudioRegenerateContentResponse>, ApiError> {
    let description = require_description(req.description.as_deref())?;
    let style = parse_style(req.style.as_deref())?;
    let kind = req
        .content_type
        .as_deref()
        .and_then(ContentKind::from_str)
        .ok_or_else(|| {
            ApiError::ValidationError("contentType must be titles, descriptions, or tags".to_string())
        })?;

    let state = state_lock.read().await.clone();

    match state
        .orchestrator
        .regenerate_content(&user.id, &description, style, kind)
        .await?
    {
        RegenerateContentOutcome::NoProject => Err(ApiError::NotFound(format!(
            "no project found for style {}",
            style.as_str()
        ))),
        RegenerateContentOutcome::Updated {
            project,
            content,
            used_fallback,
        } => Ok(Json(StudioRegenerateContentResponse {
            success: true,
            data: project,
            titles: (!content.titles.is_empty()).then_some(content.titles),
            descriptions: (!content.descriptions.is_empty()).then_some(content.descriptions),
            tags: content.tags,
            fallback: used_fallback,
        })),
    }
}

async fn submit_outcome_to_response(
    outcome: SubmitOutcome,
    state: &AppState,
    user_id: &str,
) -> Result<Json<StudioGenerateResponse>, ApiError> {
    match outcome {
        SubmitOutcome::Rejected(message) => Err(ApiError::BadRequest(message)),
        SubmitOutcome::InsufficientCredits => Err(ApiError::InsufficientCredits),
        SubmitOutcome::ThumbnailFailed {
            kind,
            message,
            credit_refunded,
        } => Err(ApiError::Generation {
            kind,
            message,
            credit_refunded,
        }),
        SubmitOutcome::Completed(done) => {
            let balance = state.credits.balance(user_id).await?;
            Ok(Json(StudioGenerateResponse {
                success: true,
                project_id: done.project_id,
                thumbnail_url: done.thumbnail_url,
                title: done.title,
                description: done.description,
                tags: done.tags,
                content_fallback: done.content_fallback,
                save_failed: done.save_failed,
                balance,
            }))
        }
    }
}
