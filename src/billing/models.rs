// src/billing/models.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Payment-event history row. Append-only.
#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Purchase {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "amountCents")]
    pub amount_cents: i64,
    #[serde(rename = "creditsAdded")]
    pub credits_added: i64,
    #[serde(rename = "purchaseType")]
    pub purchase_type: String,
    #[serde(rename = "paymentMethodLast4")]
    pub payment_method_last4: Option<String>,
    pub created_at: Option<String>,
}
