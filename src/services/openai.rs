// src/services/openai.rs
//! OpenAI image-generation client for thumbnails.

use crate::services::settings::SettingsService;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Debug, thiserror::Error)]
pub enum OpenAiError {
    #[error("API key not configured")]
    NotConfigured,

    /// The request was rejected by the provider's safety filtering. Kept
    /// separate from other failures because it drives a different client
    /// path (remediation dialog, no retry).
    #[error("Image request blocked by content policy: {0}")]
    ContentPolicyViolation(String),

    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Provider returned no image data")]
    EmptyResult,

    #[error("Settings error: {0}")]
    SettingsError(String),
}

#[derive(Debug, Clone)]
struct OpenAiConfig {
    api_key: String,
    base_url: String,
    image_model: String,
}

#[derive(Debug, Serialize)]
struct ImageGenerationRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
    b64_json: Option<String>,
}

/// Error envelope the images endpoint returns on 4xx/5xx.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    code: Option<String>,
    #[serde(rename = "type")]
    error_type: Option<String>,
    message: Option<String>,
}

#[derive(Debug)]
pub struct OpenAiService {
    settings: Arc<SettingsService>,
    client: Client,
}

impl OpenAiService {
    pub fn new(settings: Arc<SettingsService>, client: Client) -> Self {
        Self { settings, client }
    }

    async fn get_config(&self) -> Result<OpenAiConfig, OpenAiError> {
        let api_key = self
            .settings
            .get_setting("openai_api_key")
            .await
            .map_err(|e| OpenAiError::SettingsError(e.to_string()))?
            .filter(|k| !k.is_empty())
            .ok_or(OpenAiError::NotConfigured)?;

        let base_url = self
            .settings
            .get_setting_or("openai_base_url", "https://api.openai.com")
            .await
            .map_err(|e| OpenAiError::SettingsError(e.to_string()))?;

        let image_model = self
            .settings
            .get_setting_or("openai_image_model", "gpt-image-1")
            .await
            .map_err(|e| OpenAiError::SettingsError(e.to_string()))?;

        Ok(OpenAiConfig {
            api_key,
            base_url,
            image_model,
        })
    }

    /// Generate a thumbnail image for the structured prompt.
    ///
    /// Returns either a hosted URL or a `data:image/png;base64,` URL,
    /// whichever the provider hands back.
    pub async fn generate_thumbnail(&self, prompt: &str) -> Result<String, OpenAiError> {
        let config = self.get_config().await?;

        // YouTube thumbnails are 1280x720; 1792x1024 is the closest
        // landscape size the image models accept.
        let request = ImageGenerationRequest {
            model: config.image_model.clone(),
            prompt: prompt.to_string(),
            n: Some(1),
            size: Some("1792x1024".to_string()),
        };

        debug!(
            model = %config.image_model,
            prompt_chars = prompt.len(),
            "Sending image generation request"
        );

        let url = format!(
            "{}/v1/images/generations",
            config.base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| OpenAiError::RequestFailed(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(OpenAiError::RateLimitExceeded);
        }

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_error_body(status, &body));
        }

        let image_response = response
            .json::<ImageGenerationResponse>()
            .await
            .map_err(|e| OpenAiError::InvalidResponse(e.to_string()))?;

        let image = image_response.data.first().ok_or(OpenAiError::EmptyResult)?;

        let result = if let Some(url) = &image.url {
            url.clone()
        } else if let Some(b64) = &image.b64_json {
            format!("data:image/png;base64,{}", b64)
        } else {
            return Err(OpenAiError::EmptyResult);
        };

        info!(model = %config.image_model, "Image generation completed");

        Ok(result)
    }
}

/// Classify a non-success response body at the provider boundary, so
/// downstream code matches on variants instead of poking at raw JSON.
fn classify_error_body(status: reqwest::StatusCode, body: &str) -> OpenAiError {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        let details = envelope.error;
        let code = details.code.unwrap_or_default();
        let error_type = details.error_type.unwrap_or_default();
        let message = details
            .message
            .unwrap_or_else(|| "request rejected".to_string());

        let policy_hit = code == "content_policy_violation"
            || code == "moderation_blocked"
            || error_type == "image_generation_user_error"
            || message.to_lowercase().contains("safety system")
            || message.to_lowercase().contains("content policy");

        if policy_hit {
            return OpenAiError::ContentPolicyViolation(message);
        }

        error!(status = %status, code = %code, message = %message, "Image generation request failed");
        return OpenAiError::RequestFailed(format!("HTTP {}: {}", status, message));
    }

    error!(status = %status, body = %body, "Image generation request failed");
    OpenAiError::RequestFailed(format!("HTTP {}: {}", status, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_content_policy_code() {
        let body = r#"{"error":{"code":"content_policy_violation","type":"invalid_request_error","message":"Your request was rejected."}}"#;
        let err = classify_error_body(reqwest::StatusCode::BAD_REQUEST, body);
        assert!(matches!(err, OpenAiError::ContentPolicyViolation(_)));
    }

    #[test]
    fn classifies_safety_system_message() {
        let body = r#"{"error":{"code":null,"type":"invalid_request_error","message":"This request was rejected by our safety system."}}"#;
        let err = classify_error_body(reqwest::StatusCode::BAD_REQUEST, body);
        assert!(matches!(err, OpenAiError::ContentPolicyViolation(_)));
    }

    #[test]
    fn other_errors_are_request_failures() {
        let body = r#"{"error":{"code":"server_error","type":"server_error","message":"The server had an error."}}"#;
        let err = classify_error_body(reqwest::StatusCode::INTERNAL_SERVER_ERROR, body);
        assert!(matches!(err, OpenAiError::RequestFailed(_)));
    }

    #[test]
    fn unparseable_body_is_request_failure() {
        let err = classify_error_body(reqwest::StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(matches!(err, OpenAiError::RequestFailed(_)));
    }
}
