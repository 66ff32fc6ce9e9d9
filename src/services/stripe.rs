// src/services/stripe.rs
//! Minimal Stripe client: checkout sessions for credit purchases plus
//! webhook signature verification. Form-encoded requests against the REST
//! API; no SDK.

use crate::services::settings::SettingsService;
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

type HmacSha256 = Hmac<Sha256>;

const API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    #[error("Stripe not configured")]
    NotConfigured,

    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Settings error: {0}")]
    SettingsError(String),
}

/// A created Checkout Session, enough for the client to redirect.
#[derive(Debug, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

/// A retrieved Checkout Session, used for payment verification.
#[derive(Debug, Deserialize)]
pub struct CheckoutSessionDetails {
    pub id: String,
    pub payment_status: Option<String>,
    pub amount_total: Option<i64>,
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
}

impl CheckoutSessionDetails {
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }

    pub fn customer_email(&self) -> Option<&str> {
        self.customer_details.as_ref().and_then(|d| d.email.as_deref())
    }
}

/// A verified webhook event.
#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

impl StripeEvent {
    pub fn checkout_session(&self) -> Option<CheckoutSessionDetails> {
        serde_json::from_value(self.data.object.clone()).ok()
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug)]
pub struct StripeService {
    settings: Arc<SettingsService>,
    client: Client,
}

impl StripeService {
    pub fn new(settings: Arc<SettingsService>, client: Client) -> Self {
        Self { settings, client }
    }

    async fn secret_key(&self) -> Result<String, StripeError> {
        self.settings
            .get_setting("stripe_secret_key")
            .await
            .map_err(|e| StripeError::SettingsError(e.to_string()))?
            .filter(|k| !k.is_empty())
            .ok_or(StripeError::NotConfigured)
    }

    async fn setting_or(&self, key: &str, default: &str) -> Result<String, StripeError> {
        self.settings
            .get_setting_or(key, default)
            .await
            .map_err(|e| StripeError::SettingsError(e.to_string()))
    }

    /// Create a Checkout Session for the pro credit pack. Metadata carries
    /// the user id so the webhook and verify-payment paths can attribute
    /// the purchase.
    pub async fn create_checkout_session(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<CheckoutSession, StripeError> {
        let secret_key = self.secret_key().await?;
        let price_id = self
            .settings
            .get_setting("stripe_price_id")
            .await
            .map_err(|e| StripeError::SettingsError(e.to_string()))?
            .filter(|k| !k.is_empty())
            .ok_or(StripeError::NotConfigured)?;

        let base_url = self
            .setting_or("app_base_url", "http://localhost:3000")
            .await?;

        let body: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("line_items[0][price]".to_string(), price_id),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            (
                "success_url".to_string(),
                format!("{}/studio?session_id={{CHECKOUT_SESSION_ID}}", base_url),
            ),
            ("cancel_url".to_string(), format!("{}/pricing", base_url)),
            ("customer_email".to_string(), email.to_string()),
            ("metadata[user_id]".to_string(), user_id.to_string()),
        ];

        debug!(user_id = %user_id, "Creating Stripe checkout session");

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", API_BASE))
            .header(AUTHORIZATION, format!("Bearer {}", secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await
            .map_err(|e| StripeError::RequestFailed(e.to_string()))?;

        let response = ensure_success(response, "create checkout session").await?;

        let session: CheckoutSession = response
            .json()
            .await
            .map_err(|e| StripeError::InvalidResponse(e.to_string()))?;

        info!(session_id = %session.id, "Checkout session created");

        Ok(session)
    }

    /// Retrieve a Checkout Session for post-payment verification.
    pub async fn retrieve_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSessionDetails, StripeError> {
        let secret_key = self.secret_key().await?;

        let response = self
            .client
            .get(format!("{}/v1/checkout/sessions/{}", API_BASE, session_id))
            .header(AUTHORIZATION, format!("Bearer {}", secret_key))
            .send()
            .await
            .map_err(|e| StripeError::RequestFailed(e.to_string()))?;

        let response = ensure_success(response, "retrieve checkout session").await?;

        response
            .json()
            .await
            .map_err(|e| StripeError::InvalidResponse(e.to_string()))
    }

    /// Verify the `stripe-signature` header and parse the event.
    /// See https://stripe.com/docs/webhooks/signatures
    pub async fn verify_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, StripeError> {
        let webhook_secret = self
            .settings
            .get_setting("stripe_webhook_secret")
            .await
            .map_err(|e| StripeError::SettingsError(e.to_string()))?
            .filter(|k| !k.is_empty())
            .ok_or(StripeError::NotConfigured)?;

        verify_signature(&webhook_secret, payload, signature_header)
    }
}

/// Signature check split out from the service so it is testable without
/// settings plumbing.
fn verify_signature(
    webhook_secret: &str,
    payload: &[u8],
    signature_header: &str,
) -> Result<StripeEvent, StripeError> {
    let mut timestamp: Option<&str> = None;
    let mut signature: Option<&str> = None;

    for part in signature_header.split(',') {
        if let Some(rest) = part.strip_prefix("t=") {
            timestamp = Some(rest);
        } else if let Some(rest) = part.strip_prefix("v1=") {
            signature = Some(rest);
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| StripeError::InvalidSignature("missing timestamp".to_string()))?;
    let signature = signature
        .ok_or_else(|| StripeError::InvalidSignature("missing v1 signature".to_string()))?;

    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let mut mac = HmacSha256::new_from_slice(webhook_secret.as_bytes())
        .map_err(|e| StripeError::InvalidSignature(e.to_string()))?;
    mac.update(signed_payload.as_bytes());
    let expected = mac.finalize().into_bytes();
    let provided =
        hex::decode(signature).map_err(|e| StripeError::InvalidSignature(e.to_string()))?;

    if expected[..] != provided[..] {
        return Err(StripeError::InvalidSignature(
            "signature mismatch".to_string(),
        ));
    }

    serde_json::from_slice(payload).map_err(|e| StripeError::InvalidResponse(e.to_string()))
}

async fn ensure_success(
    response: reqwest::Response,
    context: &str,
) -> Result<reqwest::Response, StripeError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let (code, message) = match serde_json::from_str::<StripeErrorEnvelope>(&body) {
        Ok(envelope) => (envelope.error.code, envelope.error.message),
        Err(_) => (None, None),
    };

    error!(
        status = %status,
        stripe_error_code = ?code,
        stripe_error_message = ?message,
        context = %context,
        "Stripe API request failed"
    );

    Err(StripeError::RequestFailed(format!(
        "{} (status {})",
        context, status
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, timestamp: &str, payload: &[u8]) -> String {
        let signed = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    const EVENT: &str = r#"{
        "id": "evt_123",
        "type": "checkout.session.completed",
        "data": {"object": {"id": "cs_123", "payment_status": "paid",
                 "amount_total": 900,
                 "customer_details": {"email": "creator@example.com"},
                 "metadata": {"user_id": "user-1"}}}
    }"#;

    #[test]
    fn valid_signature_parses_event() {
        let secret = "whsec_test";
        let sig = sign(secret, "1700000000", EVENT.as_bytes());
        let header = format!("t=1700000000,v1={}", sig);

        let event = verify_signature(secret, EVENT.as_bytes(), &header).unwrap();
        assert_eq!(event.type_, "checkout.session.completed");

        let session = event.checkout_session().unwrap();
        assert!(session.is_paid());
        assert_eq!(session.customer_email(), Some("creator@example.com"));
        assert_eq!(session.metadata.get("user_id").unwrap(), "user-1");
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let secret = "whsec_test";
        let sig = sign(secret, "1700000000", EVENT.as_bytes());
        let header = format!("t=1700000000,v1={}", sig);

        let tampered = EVENT.replace("user-1", "user-2");
        let result = verify_signature(secret, tampered.as_bytes(), &header);
        assert!(matches!(result, Err(StripeError::InvalidSignature(_))));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let sig = sign("whsec_other", "1700000000", EVENT.as_bytes());
        let header = format!("t=1700000000,v1={}", sig);
        let result = verify_signature("whsec_test", EVENT.as_bytes(), &header);
        assert!(matches!(result, Err(StripeError::InvalidSignature(_))));
    }

    #[test]
    fn missing_header_parts_are_rejected() {
        assert!(matches!(
            verify_signature("whsec_test", EVENT.as_bytes(), "v1=abcd"),
            Err(StripeError::InvalidSignature(_))
        ));
        assert!(matches!(
            verify_signature("whsec_test", EVENT.as_bytes(), "t=1700000000"),
            Err(StripeError::InvalidSignature(_))
        ));
    }
}
