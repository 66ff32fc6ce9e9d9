// src/health.rs
//! Health endpoint: configuration validity plus per-feature availability.
//! Missing provider keys degrade features instead of failing the process,
//! and this is where that state is reported.

use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::common::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(rename = "configValid")]
    pub config_valid: bool,
    pub timestamp: String,
    pub features: HealthFeatures,
}

#[derive(Debug, Serialize)]
pub struct HealthFeatures {
    pub openai: bool,
    pub gemini: bool,
    pub stripe: bool,
    pub beehiiv: bool,
}

/// GET/HEAD /api/health
pub async fn health(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
) -> Response {
    let features = state_lock.read().await.features;

    let body = HealthResponse {
        status: "ok",
        config_valid: features.config_valid(),
        timestamp: Utc::now().to_rfc3339(),
        features: HealthFeatures {
            openai: features.openai,
            gemini: features.gemini,
            stripe: features.stripe,
            beehiiv: features.beehiiv,
        },
    };

    let mut response = Json(body).into_response();

    // Feature flags double as headers so HEAD probes see them too.
    let flag_headers = [
        ("x-feature-openai", features.openai),
        ("x-feature-gemini", features.gemini),
        ("x-feature-stripe", features.stripe),
        ("x-feature-beehiiv", features.beehiiv),
    ];
    for (name, enabled) in flag_headers {
        let value = if enabled { "enabled" } else { "disabled" };
        response
            .headers_mut()
            .insert(name, HeaderValue::from_static(value));
    }

    response
}
