//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use super::models::{Claims, User};
use crate::common::{safe_email_log, ApiError, AppState};

/// Authenticated user extractor.
///
/// Validates the Bearer JWT and loads the user row, provisioning it from
/// the validated claims on first sight — identity is owned by the external
/// auth provider, this service only mirrors it.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: String,
    pub email: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(state_lock): Extension<Arc<RwLock<AppState>>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let app_state = state_lock.read().await.clone();

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());

        let token = match token {
            Some(t) => t,
            None => {
                warn!("Authentication failed: missing Authorization header");
                return Err(ApiError::Unauthorized("missing auth".into()));
            }
        };

        // "Bearer <token>" or a raw token
        let bare_token = token
            .strip_prefix("Bearer ")
            .map(|rest| rest.to_string())
            .unwrap_or(token);

        let decoded = match decode::<Claims>(
            &bare_token,
            &DecodingKey::from_secret(app_state.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        ) {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "JWT token validation failed");
                return Err(ApiError::Unauthorized("invalid token".into()));
            }
        };

        let claims = decoded.claims;

        let user: Option<User> = sqlx::query_as::<_, User>(
            "SELECT id, email, full_name, created_at FROM users WHERE id = ?",
        )
        .bind(&claims.sub)
        .fetch_optional(&app_state.db)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %claims.sub, "Database error during user lookup");
            ApiError::DatabaseError(e)
        })?;

        if let Some(u) = user {
            debug!(
                user_id = %u.id,
                email = %safe_email_log(&u.email),
                "User authenticated"
            );
            return Ok(AuthedUser {
                id: u.id,
                email: u.email,
            });
        }

        // First request from this identity: mirror it locally. INSERT OR
        // IGNORE absorbs the race between two concurrent first requests.
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO users (id, email, full_name, created_at)
            VALUES (?, ?, ?, datetime('now'))
            "#,
        )
        .bind(&claims.sub)
        .bind(&claims.email)
        .bind(&claims.name)
        .execute(&app_state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        debug!(
            user_id = %claims.sub,
            email = %safe_email_log(&claims.email),
            "Provisioned user from validated claims"
        );

        Ok(AuthedUser {
            id: claims.sub,
            email: claims.email,
        })
    }
}
