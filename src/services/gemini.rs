// src/services/gemini.rs
//! Gemini text-generation client: video metadata (titles, descriptions,
//! tags) and structured-prompt analysis for the non-beast thumbnail styles.

use crate::generation::models::{ContentKind, GeneratedContent};
use crate::generation::prompts::{PromptAnalyzer, StyleId, ThemeProfile};
use crate::services::settings::SettingsService;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("API key not configured")]
    NotConfigured,

    /// HTTP 503 from the provider. The only retryable failure.
    #[error("Model overloaded: {0}")]
    Unavailable(String),

    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Settings error: {0}")]
    SettingsError(String),
}

impl GeminiError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, GeminiError::Unavailable(_))
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Validate the `candidates[0].content.parts[0].text` path at the
    /// boundary instead of trusting it downstream.
    fn into_text(self) -> Result<String, GeminiError> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| GeminiError::InvalidResponse("no text in candidates".to_string()))
    }
}

/// Shape we instruct the model to emit for metadata generation.
#[derive(Debug, Default, Deserialize)]
struct ContentPayload {
    #[serde(default)]
    titles: Vec<String>,
    #[serde(default)]
    descriptions: Vec<String>,
    #[serde(default)]
    tags: Option<String>,
}

// ============================================================================
// Retry policy
// ============================================================================

/// Run `op` up to `max_attempts` times, sleeping 1s·2^n between attempts,
/// but only when the failure is retryable (HTTP 503). Every other error
/// propagates immediately.
pub(crate) async fn retry_unavailable<T, F, Fut>(
    max_attempts: u32,
    mut op: F,
) -> Result<T, GeminiError>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, GeminiError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op(attempt).await {
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = BACKOFF_BASE * 2u32.pow(attempt - 1);
                warn!(
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Gemini unavailable, backing off"
                );
                tokio::time::sleep(delay).await;
            }
            other => return other,
        }
    }
}

// ============================================================================
// Service
// ============================================================================

#[derive(Debug)]
pub struct GeminiService {
    settings: Arc<SettingsService>,
    client: Client,
}

impl GeminiService {
    pub fn new(settings: Arc<SettingsService>, client: Client) -> Self {
        Self { settings, client }
    }

    async fn config(&self) -> Result<(String, String), GeminiError> {
        let api_key = self
            .settings
            .get_setting("gemini_api_key")
            .await
            .map_err(|e| GeminiError::SettingsError(e.to_string()))?
            .filter(|k| !k.is_empty())
            .ok_or(GeminiError::NotConfigured)?;

        let model = self
            .settings
            .get_setting_or("gemini_model", "gemini-2.0-flash")
            .await
            .map_err(|e| GeminiError::SettingsError(e.to_string()))?;

        Ok((api_key, model))
    }

    /// One completion round trip, 503s retried per `retry_unavailable`.
    pub async fn generate_text(&self, prompt: &str) -> Result<String, GeminiError> {
        let (api_key, model) = self.config().await?;

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            model, api_key
        );

        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        debug!(model = %model, prompt_chars = prompt.len(), "Sending Gemini request");

        let response = retry_unavailable(MAX_ATTEMPTS, |_attempt| {
            self.request_once(&url, &request)
        })
        .await?;

        response.into_text()
    }

    async fn request_once(
        &self,
        url: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| GeminiError::RequestFailed(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::Unavailable(body));
        }

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GeminiError::RequestFailed(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| GeminiError::InvalidResponse(e.to_string()))
    }

    /// Generate video metadata for a description, optionally restricted to
    /// one field (the regenerate-single-field path).
    pub async fn generate_video_content(
        &self,
        description: &str,
        style: StyleId,
        kind: Option<ContentKind>,
    ) -> Result<GeneratedContent, GeminiError> {
        let instruction = content_instruction(description, style, kind);
        let raw = self.generate_text(&instruction).await?;

        let stripped = strip_code_fences(&raw);
        let payload: ContentPayload = serde_json::from_str(stripped)
            .map_err(|e| GeminiError::InvalidResponse(format!("content JSON: {}", e)))?;

        let content = GeneratedContent {
            titles: payload.titles,
            descriptions: payload.descriptions,
            tags: payload.tags.filter(|t| !t.trim().is_empty()),
        };

        if content.is_empty() {
            return Err(GeminiError::InvalidResponse(
                "content JSON carried no fields".to_string(),
            ));
        }

        info!(style = style.as_str(), kind = ?kind, "Video content generation completed");

        Ok(content)
    }
}

#[async_trait]
impl PromptAnalyzer for GeminiService {
    async fn structured_prompt(
        &self,
        description: &str,
        style: StyleId,
        themes: &ThemeProfile,
        ai_chat_input: Option<&str>,
    ) -> anyhow::Result<String> {
        let instruction = analyze_instruction(description, style, themes, ai_chat_input);
        let text = self.generate_text(&instruction).await?;
        Ok(text.trim().to_string())
    }
}

// ============================================================================
// Instruction assembly
// ============================================================================

fn content_instruction(description: &str, style: StyleId, kind: Option<ContentKind>) -> String {
    let tone = match style {
        StyleId::Beast => "high-energy, curiosity-driven, bold claims",
        StyleId::Minimalist => "clean, understated, confident",
        StyleId::Cinematic => "dramatic, atmospheric, story-driven",
        StyleId::Clickbait => "maximum intrigue, urgency, emotional hooks",
    };

    let fields = match kind {
        None => {
            "\"titles\" (array of 5 title strings under 70 characters), \
             \"descriptions\" (array of 3 YouTube description strings), \
             \"tags\" (one comma-separated string of 10-15 tags)"
        }
        Some(ContentKind::Titles) => "\"titles\" (array of 5 title strings under 70 characters)",
        Some(ContentKind::Descriptions) => {
            "\"descriptions\" (array of 3 YouTube description strings)"
        }
        Some(ContentKind::Tags) => "\"tags\" (one comma-separated string of 10-15 tags)",
    };

    format!(
        "You write YouTube metadata. Video description: \"{}\". \
         Tone: {}. Respond with a single JSON object containing exactly \
         these fields: {}. No markdown, no commentary, JSON only.",
        description, tone, fields
    )
}

fn analyze_instruction(
    description: &str,
    style: StyleId,
    themes: &ThemeProfile,
    ai_chat_input: Option<&str>,
) -> String {
    let mut sections = vec![
        "You are a thumbnail art director. Write one detailed image-generation \
         prompt for a YouTube thumbnail. Output the prompt text only."
            .to_string(),
        format!("Video description: {}", description),
        format!("Style: {}", style.display_name()),
        format!("Detected subject: {}", themes.main_subject),
    ];

    if let Some(action) = &themes.action {
        sections.push(format!("Detected action: {}", action));
    }
    if let Some(setting) = &themes.setting {
        sections.push(format!("Detected setting: {}", setting));
    }
    sections.push(format!("Mood: {}", themes.mood.display_name()));

    if let Some(extra) = ai_chat_input {
        if !extra.trim().is_empty() {
            sections.push(format!("Creator notes: {}", extra.trim()));
        }
    }

    sections.push(style.art_direction().to_string());

    sections.join("\n")
}

/// The model often wraps JSON in markdown fences despite instructions.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[test]
    fn strips_json_fences() {
        assert_eq!(
            strip_code_fences("```json\n{\"titles\":[]}\n```"),
            "{\"titles\":[]}"
        );
        assert_eq!(strip_code_fences("{\"titles\":[]}"), "{\"titles\":[]}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
    }

    #[test]
    fn response_text_extraction_validates_shape() {
        let ok: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"hello"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(ok.into_text().unwrap(), "hello");

        let empty: GenerateContentResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(empty.into_text().is_err());

        let no_parts: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[{"content":{"parts":[]}}]}"#).unwrap();
        assert!(no_parts.into_text().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn retries_unavailable_exactly_three_attempts() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), GeminiError> = retry_unavailable(MAX_ATTEMPTS, |_| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(GeminiError::Unavailable("overloaded".to_string())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_delays_are_nondecreasing() {
        let stamps: Mutex<Vec<Instant>> = Mutex::new(Vec::new());
        let _: Result<(), GeminiError> = retry_unavailable(MAX_ATTEMPTS, |_| {
            stamps.lock().unwrap().push(Instant::now());
            async { Err(GeminiError::Unavailable("overloaded".to_string())) }
        })
        .await;

        let stamps = stamps.into_inner().unwrap();
        assert_eq!(stamps.len(), 3);
        let first_gap = stamps[1] - stamps[0];
        let second_gap = stamps[2] - stamps[1];
        assert_eq!(first_gap, Duration::from_secs(1));
        assert_eq!(second_gap, Duration::from_secs(2));
        assert!(second_gap >= first_gap);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_errors_fail_on_first_attempt() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), GeminiError> = retry_unavailable(MAX_ATTEMPTS, |_| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(GeminiError::RequestFailed("HTTP 500".to_string())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn success_after_transient_unavailable() {
        let attempts = AtomicU32::new(0);
        let result = retry_unavailable(MAX_ATTEMPTS, |attempt| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(GeminiError::Unavailable("overloaded".to_string()))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn content_instruction_restricts_fields() {
        let full = content_instruction("a chef cooking pasta", StyleId::Beast, None);
        assert!(full.contains("titles"));
        assert!(full.contains("descriptions"));
        assert!(full.contains("tags"));
        assert!(full.contains("a chef cooking pasta"));

        let only_tags =
            content_instruction("a chef cooking pasta", StyleId::Beast, Some(ContentKind::Tags));
        assert!(only_tags.contains("tags"));
        assert!(!only_tags.contains("titles"));
    }
}
