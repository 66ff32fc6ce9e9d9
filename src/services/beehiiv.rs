// src/services/beehiiv.rs
//! Beehiiv newsletter subscription client.

use crate::services::settings::SettingsService;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, thiserror::Error)]
pub enum BeehiivError {
    #[error("Newsletter provider not configured")]
    NotConfigured,

    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Settings error: {0}")]
    SettingsError(String),
}

#[derive(Debug, Serialize)]
struct SubscriptionRequest<'a> {
    email: &'a str,
    reactivate_existing: bool,
    utm_source: &'a str,
}

#[derive(Debug)]
pub struct BeehiivService {
    settings: Arc<SettingsService>,
    client: Client,
}

impl BeehiivService {
    pub fn new(settings: Arc<SettingsService>, client: Client) -> Self {
        Self { settings, client }
    }

    /// Subscribe an email address to the publication. Re-subscribing an
    /// existing address reactivates it rather than erroring.
    pub async fn subscribe(&self, email: &str) -> Result<(), BeehiivError> {
        let api_key = self
            .settings
            .get_setting("beehiiv_api_key")
            .await
            .map_err(|e| BeehiivError::SettingsError(e.to_string()))?
            .filter(|k| !k.is_empty())
            .ok_or(BeehiivError::NotConfigured)?;

        let publication_id = self
            .settings
            .get_setting("beehiiv_publication_id")
            .await
            .map_err(|e| BeehiivError::SettingsError(e.to_string()))?
            .filter(|k| !k.is_empty())
            .ok_or(BeehiivError::NotConfigured)?;

        let url = format!(
            "https://api.beehiiv.com/v2/publications/{}/subscriptions",
            publication_id
        );

        let request = SubscriptionRequest {
            email,
            reactivate_existing: true,
            utm_source: "ytza",
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| BeehiivError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Newsletter subscription failed");
            return Err(BeehiivError::RequestFailed(format!("HTTP {}", status)));
        }

        info!("Newsletter subscription created");

        Ok(())
    }
}
