// Error handling types for the API

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt;
use tracing::error;

use super::validation::ValidationResult;

/// Machine-readable discriminator for thumbnail-generation failures.
///
/// Content-policy rejections get their own variant because the client opens
/// a dedicated remediation dialog for them instead of a plain toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationErrorKind {
    ContentPolicyViolation,
    OpenAiApiError,
    ImageGenerationFailed,
    InternalServerError,
}

impl GenerationErrorKind {
    pub fn as_code(&self) -> &'static str {
        match self {
            GenerationErrorKind::ContentPolicyViolation => "CONTENT_POLICY_VIOLATION",
            GenerationErrorKind::OpenAiApiError => "OPENAI_API_ERROR",
            GenerationErrorKind::ImageGenerationFailed => "IMAGE_GENERATION_FAILED",
            GenerationErrorKind::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            GenerationErrorKind::ContentPolicyViolation => StatusCode::BAD_REQUEST,
            GenerationErrorKind::OpenAiApiError => StatusCode::BAD_GATEWAY,
            GenerationErrorKind::ImageGenerationFailed
            | GenerationErrorKind::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error types
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    Forbidden(String),
    BadRequest(String),
    NotFound(String),
    InternalServer(String),
    ServiceUnavailable(String),
    DatabaseError(sqlx::Error),
    ValidationError(String),
    InsufficientCredits,
    RateLimited { retry_after: u32 },
    /// Thumbnail-generation failure. `credit_refunded` tells the client
    /// whether the debit taken for this attempt was compensated.
    Generation {
        kind: GenerationErrorKind,
        message: String,
        credit_refunded: bool,
    },
    PaymentIncomplete(String),
    WebhookRejected(String),
    NotConfigured(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::InternalServer(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service Unavailable: {}", msg),
            ApiError::DatabaseError(e) => write!(f, "Database Error: {}", e),
            ApiError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            ApiError::InsufficientCredits => write!(f, "Insufficient credits"),
            ApiError::RateLimited { retry_after } => {
                write!(f, "Rate limit exceeded, retry after {}s", retry_after)
            }
            ApiError::Generation { kind, message, .. } => {
                write!(f, "{}: {}", kind.as_code(), message)
            }
            ApiError::PaymentIncomplete(msg) => write!(f, "Payment Incomplete: {}", msg),
            ApiError::WebhookRejected(msg) => write!(f, "Webhook Rejected: {}", msg),
            ApiError::NotConfigured(msg) => write!(f, "Not Configured: {}", msg),
        }
    }
}

/// JSON error response structure.
///
/// `error` carries the machine-readable discriminator, `message` the human
/// text. `creditRefunded` and `retryAfter` appear only where they apply.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(rename = "creditRefunded", skip_serializing_if = "Option::is_none")]
    pub credit_refunded: Option<bool>,
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u32>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message, credit_refunded, retry_after) = match self {
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg, None, None)
            }
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg, None, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None, None),
            ApiError::InternalServer(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                msg,
                None,
                None,
            ),
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                msg,
                None,
                None,
            ),
            ApiError::DatabaseError(e) => {
                error!(error = %e, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database operation failed".to_string(),
                    None,
                    None,
                )
            }
            ApiError::ValidationError(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg, None, None)
            }
            ApiError::InsufficientCredits => (
                StatusCode::BAD_REQUEST,
                "INSUFFICIENT_CREDITS",
                "Not enough credits to generate a thumbnail".to_string(),
                None,
                None,
            ),
            ApiError::RateLimited { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMIT_EXCEEDED",
                "Rate limit exceeded. Please try again later.".to_string(),
                None,
                Some(retry_after),
            ),
            ApiError::Generation {
                kind,
                message,
                credit_refunded,
            } => (
                kind.status(),
                kind.as_code(),
                message,
                Some(credit_refunded),
                None,
            ),
            ApiError::PaymentIncomplete(msg) => (
                StatusCode::BAD_REQUEST,
                "PAYMENT_NOT_COMPLETED",
                msg,
                None,
                None,
            ),
            ApiError::WebhookRejected(msg) => (
                StatusCode::BAD_REQUEST,
                "WEBHOOK_SIGNATURE_INVALID",
                msg,
                None,
                None,
            ),
            ApiError::NotConfigured(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PROVIDER_NOT_CONFIGURED",
                msg,
                None,
                None,
            ),
        };

        let body = ErrorResponse {
            error: code.to_string(),
            message,
            credit_refunded,
            retry_after,
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::DatabaseError(e)
    }
}

impl From<ValidationResult> for ApiError {
    fn from(result: ValidationResult) -> Self {
        if result.is_valid {
            ApiError::InternalServer(
                "Validation result was valid but converted to error".to_string(),
            )
        } else {
            let error_messages: Vec<String> = result
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();
            ApiError::ValidationError(error_messages.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_kind_codes_are_stable() {
        assert_eq!(
            GenerationErrorKind::ContentPolicyViolation.as_code(),
            "CONTENT_POLICY_VIOLATION"
        );
        assert_eq!(
            GenerationErrorKind::OpenAiApiError.as_code(),
            "OPENAI_API_ERROR"
        );
        assert_eq!(
            GenerationErrorKind::ImageGenerationFailed.as_code(),
            "IMAGE_GENERATION_FAILED"
        );
    }

    #[test]
    fn validation_result_converts_to_field_messages() {
        let mut result = ValidationResult::new();
        result.add_error("prompt", "Prompt is required");
        let err = ApiError::from(result);
        match err {
            ApiError::ValidationError(msg) => assert!(msg.contains("prompt")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
