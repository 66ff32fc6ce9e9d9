// src/billing/routes.rs

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Create the billing router
pub fn billing_routes() -> Router {
    Router::new()
        .route("/api/credits", get(handlers::get_credits))
        .route("/api/select-plan", post(handlers::select_plan))
        .route(
            "/api/create-checkout-session",
            post(handlers::create_checkout_session),
        )
        .route("/api/verify-payment", post(handlers::verify_payment))
        .route("/api/purchase-history", get(handlers::purchase_history))
        .route("/api/webhooks/stripe", post(handlers::stripe_webhook))
}
