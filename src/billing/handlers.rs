// src/billing/handlers.rs
//! Billing handlers: plan selection, checkout, payment verification,
//! purchase history, and the Stripe webhook.

use axum::body::Bytes;
use axum::http::HeaderMap;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use super::models::Purchase;
use crate::auth::AuthedUser;
use crate::common::{safe_email_log, ApiError, AppState};
use crate::credits::SubscriptionTier;
use crate::services::stripe::{CheckoutSessionDetails, StripeError};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SelectPlanRequest {
    #[serde(rename = "planName")]
    pub plan_name: String,
}

#[derive(Debug, Serialize)]
pub struct SelectPlanResponse {
    pub success: bool,
    #[serde(rename = "planName")]
    pub plan_name: String,
    #[serde(rename = "checkoutRequired", skip_serializing_if = "std::ops::Not::not")]
    pub checkout_required: bool,
}

#[derive(Debug, Serialize)]
pub struct CheckoutSessionResponse {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub plan: String,
    pub balance: i64,
}

#[derive(Debug, Serialize)]
pub struct PurchaseHistoryResponse {
    pub purchases: Vec<Purchase>,
}

#[derive(Debug, Serialize)]
pub struct CreditsResponse {
    pub balance: i64,
    #[serde(rename = "subscriptionTier")]
    pub subscription_tier: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Current credit balance and tier
/// GET /api/credits
pub async fn get_credits(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
) -> Result<Json<CreditsResponse>, ApiError> {
    let state = state_lock.read().await.clone();
    let account = state.credits.account(&user.id).await?;

    Ok(Json(CreditsResponse {
        balance: account.as_ref().map(|a| a.balance).unwrap_or(0),
        subscription_tier: account.map(|a| a.subscription_tier),
    }))
}

/// Select a plan. The free plan provisions the starter credit account;
/// paid plans point the client at checkout.
/// POST /api/select-plan
pub async fn select_plan(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Json(req): Json<SelectPlanRequest>,
) -> Result<Json<SelectPlanResponse>, ApiError> {
    let tier = SubscriptionTier::from_str(&req.plan_name)
        .ok_or_else(|| ApiError::ValidationError(format!("invalid plan: {}", req.plan_name)))?;

    let state = state_lock.read().await.clone();

    match tier {
        SubscriptionTier::Free => {
            state.credits.ensure_account(&user.id, tier).await?;
            info!(user_id = %user.id, "Free plan selected");
            Ok(Json(SelectPlanResponse {
                success: true,
                plan_name: tier.as_str().to_string(),
                checkout_required: false,
            }))
        }
        SubscriptionTier::Pro | SubscriptionTier::ProLifetime => Ok(Json(SelectPlanResponse {
            success: true,
            plan_name: tier.as_str().to_string(),
            checkout_required: true,
        })),
    }
}

/// Create a Stripe Checkout Session for the pro credit pack
/// POST /api/create-checkout-session
pub async fn create_checkout_session(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
) -> Result<Json<CheckoutSessionResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    let session = state
        .stripe
        .create_checkout_session(&user.id, &user.email)
        .await
        .map_err(map_stripe_error)?;

    let url = session
        .url
        .ok_or_else(|| ApiError::InternalServer("checkout session has no URL".to_string()))?;

    Ok(Json(CheckoutSessionResponse {
        session_id: session.id,
        url,
    }))
}

/// Verify a completed checkout and grant the purchased credits.
/// Idempotent per checkout session.
/// POST /api/verify-payment
pub async fn verify_payment(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Json(req): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>, ApiError> {
    if req.session_id.trim().is_empty() {
        return Err(ApiError::BadRequest("sessionId is required".to_string()));
    }

    let state = state_lock.read().await.clone();

    let session = state
        .stripe
        .retrieve_checkout_session(req.session_id.trim())
        .await
        .map_err(map_stripe_error)?;

    // The session must belong to the caller: either the metadata user id
    // or the checkout email has to match.
    let metadata_user = session.metadata.get("user_id").map(String::as_str);
    let email_matches = session
        .customer_email()
        .map(|e| e.eq_ignore_ascii_case(&user.email))
        .unwrap_or(false);

    if metadata_user != Some(user.id.as_str()) && !email_matches {
        warn!(
            user_id = %user.id,
            email = %safe_email_log(&user.email),
            session_id = %session.id,
            "Checkout session does not belong to the caller"
        );
        return Err(ApiError::Forbidden(
            "checkout session does not belong to this account".to_string(),
        ));
    }

    if !session.is_paid() {
        return Err(ApiError::PaymentIncomplete(
            "payment has not completed".to_string(),
        ));
    }

    let plan = apply_paid_checkout(&state, &user.id, &session).await?;
    let balance = state.credits.balance(&user.id).await?;

    Ok(Json(VerifyPaymentResponse {
        success: true,
        plan: plan.as_str().to_string(),
        balance,
    }))
}

/// Purchase history, newest first
/// GET /api/purchase-history
pub async fn purchase_history(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
) -> Result<Json<PurchaseHistoryResponse>, ApiError> {
    let db = state_lock.read().await.db.clone();

    let purchases = sqlx::query_as::<_, Purchase>(
        r#"
        SELECT id, user_id, amount_cents, credits_added, purchase_type,
               payment_method_last4, created_at
        FROM purchases
        WHERE user_id = ?
        ORDER BY created_at DESC, rowid DESC
        "#,
    )
    .bind(&user.id)
    .fetch_all(&db)
    .await?;

    Ok(Json(PurchaseHistoryResponse { purchases }))
}

/// Stripe webhook receiver. No session auth; the signature is the
/// authentication.
/// POST /api/webhooks/stripe
pub async fn stripe_webhook(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::WebhookRejected("missing stripe-signature".to_string()))?;

    let state = state_lock.read().await.clone();

    let event = state
        .stripe
        .verify_webhook(&body, signature)
        .await
        .map_err(|e| ApiError::WebhookRejected(e.to_string()))?;

    if event.type_ == "checkout.session.completed" {
        let Some(session) = event.checkout_session() else {
            warn!("checkout.session.completed event without a parseable session");
            return Ok(Json(serde_json::json!({ "received": true })));
        };

        match session.metadata.get("user_id") {
            Some(user_id) if session.is_paid() => {
                let user_id = user_id.clone();
                apply_paid_checkout(&state, &user_id, &session).await?;
            }
            Some(_) => {
                info!(session_id = %session.id, "Checkout completed but unpaid, skipping grant");
            }
            None => {
                warn!(session_id = %session.id, "Checkout session has no user_id metadata");
            }
        }
    }

    Ok(Json(serde_json::json!({ "received": true })))
}

// ============================================================================
// Helpers
// ============================================================================

fn map_stripe_error(e: StripeError) -> ApiError {
    match e {
        StripeError::NotConfigured => {
            ApiError::NotConfigured("payments are not configured".to_string())
        }
        other => ApiError::ServiceUnavailable(format!("payment provider error: {}", other)),
    }
}

/// Record the purchase and grant credits, once per checkout session. The
/// UNIQUE constraint on stripe_session_id makes a webhook/verify race or a
/// replay a harmless no-op.
pub(crate) async fn apply_paid_checkout(
    state: &AppState,
    user_id: &str,
    session: &CheckoutSessionDetails,
) -> Result<SubscriptionTier, ApiError> {
    let plan = session
        .metadata
        .get("plan")
        .and_then(|p| SubscriptionTier::from_str(p))
        .unwrap_or(SubscriptionTier::Pro);

    let credits = plan.granted_credits();
    let amount_cents = session.amount_total.unwrap_or(0);

    let inserted = sqlx::query(
        r#"
        INSERT OR IGNORE INTO purchases (
            id, user_id, amount_cents, credits_added, purchase_type,
            payment_method_last4, stripe_session_id, created_at
        )
        VALUES (?, ?, ?, ?, ?, NULL, ?, datetime('now'))
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(amount_cents)
    .bind(credits)
    .bind(plan.as_str())
    .bind(&session.id)
    .execute(&state.db)
    .await?;

    if inserted.rows_affected() == 0 {
        info!(user_id = %user_id, session_id = %session.id, "Checkout already applied");
        return Ok(plan);
    }

    state.credits.grant(user_id, credits, plan).await?;

    info!(
        user_id = %user_id,
        session_id = %session.id,
        credits = credits,
        plan = plan.as_str(),
        "Purchase recorded and credits granted"
    );

    Ok(plan)
}
