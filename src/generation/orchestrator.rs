// src/generation/orchestrator.rs
//! The generation workflow: one module owns the phase state machine and the
//! submit / regenerate flows, so there is a single source of truth for how
//! a generation attempt proceeds and compensates.
//!
//! Steps inside one run are strictly sequential; nothing serializes
//! overlapping runs from the same user, and the last response to resolve
//! wins whatever state the client renders. Credits are the only shared
//! state with a hard requirement, protected by the ledger's conditional
//! debit rather than by the advisory pre-flight balance read here.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::models::{fallback_content, ContentKind, GeneratedContent};
use super::prompts::{
    generate_thumbnail_prompt, PromptAnalyzer, StyleId, TextOverlay,
};
use crate::common::GenerationErrorKind;
use crate::credits::{CreditLedger, DebitOutcome};
use crate::projects::models::{ContentPatch, NewProject, Project};
use crate::projects::store;
use crate::services::gemini::GeminiService;
use crate::services::openai::{OpenAiError, OpenAiService};

// ============================================================================
// Phase state machine
// ============================================================================

/// The named steps of a single generation attempt. Ephemeral: phases are
/// reported to the sink as they happen and nothing survives the run, so an
/// interrupted generation has no resumption - the debit stands with nothing
/// to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationPhase {
    Initializing,
    GeneratingThumbnail,
    GeneratingContent,
    Finalizing,
}

impl GenerationPhase {
    /// Fixed progress percentage shown for the phase.
    pub fn progress(&self) -> u8 {
        match self {
            GenerationPhase::Initializing => 10,
            GenerationPhase::GeneratingThumbnail => 40,
            GenerationPhase::GeneratingContent => 85,
            GenerationPhase::Finalizing => 100,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationPhase::Initializing => "initializing",
            GenerationPhase::GeneratingThumbnail => "generating-thumbnail",
            GenerationPhase::GeneratingContent => "generating-content",
            GenerationPhase::Finalizing => "finalizing",
        }
    }
}

/// Receives phase transitions; `None` means back to idle.
pub trait ProgressSink: Send + Sync {
    fn on_phase(&self, phase: Option<GenerationPhase>);
}

/// Sink for callers that do not track progress.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn on_phase(&self, _phase: Option<GenerationPhase>) {}
}

// ============================================================================
// Provider seams
// ============================================================================

/// Thumbnail provider failure, already classified.
#[derive(Debug, thiserror::Error)]
pub enum ThumbnailError {
    #[error("blocked by content policy: {0}")]
    ContentPolicy(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("provider returned no image")]
    Empty,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ThumbnailError {
    pub fn kind(&self) -> GenerationErrorKind {
        match self {
            ThumbnailError::ContentPolicy(_) => GenerationErrorKind::ContentPolicyViolation,
            ThumbnailError::Provider(_) => GenerationErrorKind::OpenAiApiError,
            ThumbnailError::Empty => GenerationErrorKind::ImageGenerationFailed,
            ThumbnailError::Internal(_) => GenerationErrorKind::InternalServerError,
        }
    }
}

#[async_trait]
pub trait ThumbnailGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ThumbnailError>;
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(
        &self,
        description: &str,
        style: StyleId,
        kind: Option<ContentKind>,
    ) -> anyhow::Result<GeneratedContent>;
}

#[async_trait]
impl ThumbnailGenerator for OpenAiService {
    async fn generate(&self, prompt: &str) -> Result<String, ThumbnailError> {
        match self.generate_thumbnail(prompt).await {
            Ok(url) => Ok(url),
            Err(OpenAiError::ContentPolicyViolation(msg)) => {
                Err(ThumbnailError::ContentPolicy(msg))
            }
            Err(OpenAiError::EmptyResult) => Err(ThumbnailError::Empty),
            Err(e @ OpenAiError::RequestFailed(_))
            | Err(e @ OpenAiError::RateLimitExceeded)
            | Err(e @ OpenAiError::InvalidResponse(_)) => {
                Err(ThumbnailError::Provider(e.to_string()))
            }
            Err(e) => Err(ThumbnailError::Internal(e.to_string())),
        }
    }
}

#[async_trait]
impl ContentGenerator for GeminiService {
    async fn generate(
        &self,
        description: &str,
        style: StyleId,
        kind: Option<ContentKind>,
    ) -> anyhow::Result<GeneratedContent> {
        Ok(self.generate_video_content(description, style, kind).await?)
    }
}

// ============================================================================
// Requests and outcomes
// ============================================================================

#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub description: String,
    pub style: StyleId,
    pub overlay: Option<TextOverlay>,
    pub ai_chat_input: Option<String>,
}

/// Result of a full submit or an image-only regeneration.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Preconditions failed; nothing happened.
    Rejected(String),
    /// Pre-flight or debit-time balance check failed; no provider call was
    /// made and nothing was charged.
    InsufficientCredits,
    /// The thumbnail step failed after the debit; the credit was refunded.
    /// `kind` distinguishes the content-policy remediation path from plain
    /// provider failures.
    ThumbnailFailed {
        kind: GenerationErrorKind,
        message: String,
        credit_refunded: bool,
    },
    Completed(CompletedGeneration),
}

/// The artifacts a finished run leaves behind. Persistence failure does not
/// roll anything back; `save_failed` just tells the client to offer re-save.
#[derive(Debug, Serialize)]
pub struct CompletedGeneration {
    #[serde(rename = "projectId")]
    pub project_id: Option<String>,
    #[serde(rename = "thumbnailUrl")]
    pub thumbnail_url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
    #[serde(rename = "contentFallback")]
    pub content_fallback: bool,
    #[serde(rename = "saveFailed")]
    pub save_failed: bool,
}

/// Result of a single-field content regeneration.
#[derive(Debug)]
pub enum RegenerateContentOutcome {
    NoProject,
    Updated {
        project: Project,
        content: GeneratedContent,
        used_fallback: bool,
    },
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct GenerationOrchestrator {
    db: SqlitePool,
    credits: Arc<CreditLedger>,
    thumbnails: Arc<dyn ThumbnailGenerator>,
    content: Arc<dyn ContentGenerator>,
    analyzer: Arc<dyn PromptAnalyzer>,
}

impl GenerationOrchestrator {
    pub fn new(
        db: SqlitePool,
        credits: Arc<CreditLedger>,
        thumbnails: Arc<dyn ThumbnailGenerator>,
        content: Arc<dyn ContentGenerator>,
        analyzer: Arc<dyn PromptAnalyzer>,
    ) -> Self {
        Self {
            db,
            credits,
            thumbnails,
            content,
            analyzer,
        }
    }

    /// Run the full generation flow: prompt, thumbnail, content, save.
    pub async fn submit(
        &self,
        user_id: &str,
        req: &SubmitRequest,
        progress: &dyn ProgressSink,
    ) -> Result<SubmitOutcome, sqlx::Error> {
        if req.description.trim().is_empty() {
            return Ok(SubmitOutcome::Rejected("description is required".to_string()));
        }

        // Advisory pre-flight read so users with an empty account never
        // reach the provider. The authoritative check is the conditional
        // debit below - two racing submits can both pass this read, but
        // only one will win the last credit.
        if self.credits.balance(user_id).await? < 1 {
            info!(user_id = %user_id, "Generation blocked: insufficient credits");
            return Ok(SubmitOutcome::InsufficientCredits);
        }

        progress.on_phase(Some(GenerationPhase::Initializing));

        let prompt = generate_thumbnail_prompt(
            &req.description,
            req.style,
            req.overlay.as_ref(),
            req.ai_chat_input.as_deref(),
            self.analyzer.as_ref(),
        )
        .await;

        progress.on_phase(Some(GenerationPhase::GeneratingThumbnail));

        let thumbnail_url = match self.charged_thumbnail(user_id, &prompt).await? {
            Ok(url) => url,
            Err(outcome) => {
                progress.on_phase(None);
                return Ok(outcome);
            }
        };

        progress.on_phase(Some(GenerationPhase::GeneratingContent));

        // Content failure is non-fatal: degrade to locally derived fields
        // rather than wasting the generated image.
        let (content, content_fallback) = match self
            .content
            .generate(&req.description, req.style, None)
            .await
        {
            Ok(content) => (content, false),
            Err(e) => {
                warn!(error = %e, "Content generation failed, using local fallback");
                (fallback_content(&req.description), true)
            }
        };

        progress.on_phase(Some(GenerationPhase::Finalizing));

        let new_project = NewProject {
            selected_style_id: req.style.as_str().to_string(),
            thumbnail_storage_path: thumbnail_url.clone(),
            generated_yt_title: content.best_title().map(String::from),
            generated_yt_description: content.best_description().map(String::from),
            generated_yt_tags: content.tags.clone(),
        };

        // No rollback across steps: a failed save keeps the debit and the
        // artifact, and the client may re-save.
        let (project_id, save_failed) =
            match store::insert_project(&self.db, user_id, &new_project).await {
                Ok(project) => (Some(project.id), false),
                Err(e) => {
                    error!(error = %e, user_id = %user_id, "Failed to persist project");
                    (None, true)
                }
            };

        progress.on_phase(None);

        info!(
            user_id = %user_id,
            style = req.style.as_str(),
            content_fallback = content_fallback,
            save_failed = save_failed,
            "Generation completed"
        );

        Ok(SubmitOutcome::Completed(CompletedGeneration {
            project_id,
            thumbnail_url,
            title: content.best_title().map(String::from),
            description: content.best_description().map(String::from),
            tags: content.tags,
            content_fallback,
            save_failed,
        }))
    }

    /// Regenerate only the thumbnail, preserving the project's text fields.
    pub async fn regenerate_image(
        &self,
        user_id: &str,
        req: &SubmitRequest,
        progress: &dyn ProgressSink,
    ) -> Result<SubmitOutcome, sqlx::Error> {
        if req.description.trim().is_empty() {
            return Ok(SubmitOutcome::Rejected("description is required".to_string()));
        }

        if self.credits.balance(user_id).await? < 1 {
            return Ok(SubmitOutcome::InsufficientCredits);
        }

        progress.on_phase(Some(GenerationPhase::Initializing));

        let prompt = generate_thumbnail_prompt(
            &req.description,
            req.style,
            req.overlay.as_ref(),
            req.ai_chat_input.as_deref(),
            self.analyzer.as_ref(),
        )
        .await;

        progress.on_phase(Some(GenerationPhase::GeneratingThumbnail));

        let thumbnail_url = match self.charged_thumbnail(user_id, &prompt).await? {
            Ok(url) => url,
            Err(outcome) => {
                progress.on_phase(None);
                return Ok(outcome);
            }
        };

        progress.on_phase(Some(GenerationPhase::Finalizing));

        let (project_id, save_failed) = match store::update_thumbnail(
            &self.db,
            user_id,
            req.style.as_str(),
            &thumbnail_url,
        )
        .await
        {
            Ok(Some(project)) => (Some(project.id), false),
            Ok(None) => {
                warn!(user_id = %user_id, style = req.style.as_str(), "No project to update");
                (None, true)
            }
            Err(e) => {
                error!(error = %e, "Failed to update project thumbnail");
                (None, true)
            }
        };

        progress.on_phase(None);

        Ok(SubmitOutcome::Completed(CompletedGeneration {
            project_id,
            thumbnail_url,
            title: None,
            description: None,
            tags: None,
            content_fallback: false,
            save_failed,
        }))
    }

    /// Regenerate a single content field and persist only that column.
    /// Deliberately emits no global phase events (per-field spinners only).
    /// Two racing single-field regenerations are last-write-wins.
    pub async fn regenerate_content(
        &self,
        user_id: &str,
        description: &str,
        style: StyleId,
        kind: ContentKind,
    ) -> Result<RegenerateContentOutcome, sqlx::Error> {
        let (content, used_fallback) = match self
            .content
            .generate(description, style, Some(kind))
            .await
        {
            Ok(content) => (content, false),
            Err(e) => {
                warn!(error = %e, kind = kind.as_str(), "Field regeneration failed, using fallback");
                (fallback_content(description), true)
            }
        };

        let patch = match kind {
            ContentKind::Titles => ContentPatch {
                generated_yt_title: content.best_title().map(String::from),
                ..Default::default()
            },
            ContentKind::Descriptions => ContentPatch {
                generated_yt_description: content.best_description().map(String::from),
                ..Default::default()
            },
            ContentKind::Tags => ContentPatch {
                generated_yt_tags: content.tags.clone(),
                ..Default::default()
            },
        };

        match store::update_content(&self.db, user_id, style.as_str(), &patch).await? {
            Some(project) => Ok(RegenerateContentOutcome::Updated {
                project,
                content,
                used_fallback,
            }),
            None => Ok(RegenerateContentOutcome::NoProject),
        }
    }

    /// Debit one credit, call the image provider, refund on any failure.
    /// The inner Err carries the fully-formed outcome for the caller. Also
    /// the whole of the standalone generate-thumbnail endpoint, which is
    /// why it is public.
    pub async fn charged_thumbnail(
        &self,
        user_id: &str,
        prompt: &str,
    ) -> Result<Result<String, SubmitOutcome>, sqlx::Error> {
        match self.credits.debit_one(user_id).await? {
            DebitOutcome::InsufficientCredits => {
                return Ok(Err(SubmitOutcome::InsufficientCredits));
            }
            DebitOutcome::Debited => {}
        }

        match self.thumbnails.generate(prompt).await {
            Ok(url) => Ok(Ok(url)),
            Err(e) => {
                // Compensate before reporting: the response must only say
                // creditRefunded once the refund has actually landed.
                self.credits.refund_one(user_id).await?;
                warn!(
                    user_id = %user_id,
                    kind = e.kind().as_code(),
                    error = %e,
                    "Thumbnail generation failed, credit refunded"
                );
                Ok(Err(SubmitOutcome::ThumbnailFailed {
                    kind: e.kind(),
                    message: e.to_string(),
                    credit_refunded: true,
                }))
            }
        }
    }
}

#[cfg(test)]
mod phase_tests {
    use super::*;

    #[test]
    fn phases_map_to_fixed_progress() {
        assert_eq!(GenerationPhase::Initializing.progress(), 10);
        assert_eq!(GenerationPhase::GeneratingThumbnail.progress(), 40);
        assert_eq!(GenerationPhase::GeneratingContent.progress(), 85);
        assert_eq!(GenerationPhase::Finalizing.progress(), 100);
    }

    #[test]
    fn phase_names_are_kebab_case() {
        assert_eq!(GenerationPhase::GeneratingThumbnail.as_str(), "generating-thumbnail");
        assert_eq!(
            serde_json::to_string(&GenerationPhase::GeneratingContent).unwrap(),
            "\"generating-content\""
        );
    }
}
