// src/newsletter/handlers.rs
//! Newsletter signup handler

use axum::{Extension, Json};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::OnceLock;
use tokio::sync::RwLock;
use tracing::info;

use crate::common::{safe_email_log, ApiError, AppState};
use crate::services::beehiiv::BeehiivError;

#[derive(Debug, Deserialize)]
pub struct NewsletterRequest {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NewsletterResponse {
    pub success: bool,
    pub message: String,
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("email regex")
    })
}

/// Subscribe an email to the newsletter. Unauthenticated: the landing page
/// drives this.
/// POST /api/newsletter
pub async fn subscribe(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(req): Json<NewsletterRequest>,
) -> Result<Json<NewsletterResponse>, ApiError> {
    let email = req
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty() && e.len() <= 254)
        .ok_or_else(|| ApiError::BadRequest("email is required".to_string()))?;

    if !email_regex().is_match(email) {
        return Err(ApiError::BadRequest("invalid email address".to_string()));
    }

    let state = state_lock.read().await.clone();

    state.beehiiv.subscribe(email).await.map_err(|e| match e {
        BeehiivError::NotConfigured => {
            ApiError::NotConfigured("newsletter provider not configured".to_string())
        }
        other => ApiError::ServiceUnavailable(format!("newsletter signup failed: {}", other)),
    })?;

    info!(email = %safe_email_log(email), "Newsletter subscription accepted");

    Ok(Json(NewsletterResponse {
        success: true,
        message: "Subscribed! Check your inbox to confirm.".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_regex_accepts_normal_addresses() {
        assert!(email_regex().is_match("creator@example.com"));
        assert!(email_regex().is_match("a.b+tag@sub.domain.co"));
    }

    #[test]
    fn email_regex_rejects_malformed_addresses() {
        for bad in ["", "plain", "@nodomain.com", "user@", "user@host", "a b@c.com"] {
            assert!(!email_regex().is_match(bad), "{} should be rejected", bad);
        }
    }
}
