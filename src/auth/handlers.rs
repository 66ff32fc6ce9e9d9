//! Profile handlers

use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::extractors::AuthedUser;
use super::models::User;
use crate::common::sanitize::sanitize_text;
use crate::common::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: String,
    pub email: String,
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
    pub balance: i64,
    #[serde(rename = "subscriptionTier")]
    pub subscription_tier: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(rename = "fullName")]
    pub full_name: String,
}

/// GET /api/me - current user with credit summary
pub async fn me_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
) -> Result<Json<MeResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    let row: Option<User> = sqlx::query_as::<_, User>(
        "SELECT id, email, full_name, created_at FROM users WHERE id = ?",
    )
    .bind(&user.id)
    .fetch_optional(&state.db)
    .await?;

    let row = row.ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
    let account = state.credits.account(&user.id).await?;

    Ok(Json(MeResponse {
        id: row.id,
        email: row.email,
        full_name: row.full_name,
        balance: account.as_ref().map(|a| a.balance).unwrap_or(0),
        subscription_tier: account.map(|a| a.subscription_tier),
    }))
}

/// PATCH /api/me - update the profile full name
pub async fn update_profile(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    user: AuthedUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let full_name = sanitize_text(&req.full_name, 120);
    if full_name.is_empty() {
        return Err(ApiError::ValidationError("fullName is required".to_string()));
    }

    sqlx::query("UPDATE users SET full_name = ? WHERE id = ?")
        .bind(&full_name)
        .bind(&user.id)
        .execute(&state_lock.read().await.db)
        .await?;

    info!(user_id = %user.id, "Profile updated");

    Ok(Json(serde_json::json!({ "success": true, "fullName": full_name })))
}
