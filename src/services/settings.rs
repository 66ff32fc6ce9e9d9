// src/services/settings.rs
//! Layered configuration: environment variables take precedence over rows
//! in the system_settings table; reads go through a short-lived in-memory
//! cache. Sensitive values can be sealed at rest with EncryptionService.

use crate::services::encryption::{EncryptionError, EncryptionService};
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Encryption error: {0}")]
    EncryptionError(#[from] EncryptionError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone)]
struct CachedSetting {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct SettingsService {
    db: SqlitePool,
    cache: Arc<RwLock<HashMap<String, CachedSetting>>>,
    encryption: Option<EncryptionService>,
    cache_ttl: Duration,
}

impl SettingsService {
    pub fn new(db: SqlitePool) -> Self {
        let encryption = match EncryptionService::from_env() {
            Ok(service) => {
                info!("Settings encryption enabled");
                Some(service)
            }
            Err(e) => {
                warn!(
                    "Settings encryption not available: {}. Sensitive settings are stored in plaintext.",
                    e
                );
                None
            }
        };

        Self {
            db,
            cache: Arc::new(RwLock::new(HashMap::new())),
            encryption,
            cache_ttl: Duration::minutes(5),
        }
    }

    /// Get a setting value by key.
    ///
    /// Resolution order: environment variable (key uppercased), cache,
    /// database row (decrypted when flagged).
    pub async fn get_setting(&self, key: &str) -> Result<Option<String>, SettingsError> {
        if let Ok(value) = env::var(key.to_uppercase()) {
            if !value.is_empty() {
                return Ok(Some(value));
            }
        }

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(key) {
                if cached.expires_at > Utc::now() {
                    debug!(key = %key, "Setting retrieved from cache");
                    return Ok(Some(cached.value.clone()));
                }
            }
        }

        let row: Option<(String, Option<i64>)> =
            sqlx::query_as("SELECT value, encrypted FROM system_settings WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.db)
                .await?;

        let Some((stored, encrypted)) = row else {
            return Ok(None);
        };

        let value = if encrypted.unwrap_or(0) == 1 {
            match &self.encryption {
                Some(service) => service.open(&stored).map_err(|e| {
                    error!(key = %key, error = %e, "Failed to decrypt setting");
                    SettingsError::EncryptionError(e)
                })?,
                None => {
                    error!(key = %key, "Setting is encrypted but no master key is configured");
                    return Err(SettingsError::InvalidConfig(
                        "Settings encryption not configured".to_string(),
                    ));
                }
            }
        } else {
            stored
        };

        let mut cache = self.cache.write().await;
        cache.insert(
            key.to_string(),
            CachedSetting {
                value: value.clone(),
                expires_at: Utc::now() + self.cache_ttl,
            },
        );

        Ok(Some(value))
    }

    /// Get a setting with a default fallback.
    pub async fn get_setting_or(&self, key: &str, default: &str) -> Result<String, SettingsError> {
        Ok(self
            .get_setting(key)
            .await?
            .unwrap_or_else(|| default.to_string()))
    }

    /// Store a setting. `sensitive` values are sealed when a master key is
    /// configured, otherwise stored in plaintext with a warning.
    pub async fn set_setting(
        &self,
        key: &str,
        value: &str,
        sensitive: bool,
    ) -> Result<(), SettingsError> {
        let (stored, encrypted_flag) = if sensitive {
            match &self.encryption {
                Some(service) => (service.seal(value)?, 1i64),
                None => {
                    warn!(key = %key, "Storing sensitive setting unencrypted (no master key)");
                    (value.to_string(), 0)
                }
            }
        } else {
            (value.to_string(), 0)
        };

        sqlx::query(
            r#"
            INSERT INTO system_settings (key, value, encrypted, updated_at, updated_by)
            VALUES (?, ?, ?, datetime('now'), 'api')
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                encrypted = excluded.encrypted,
                updated_at = excluded.updated_at,
                updated_by = excluded.updated_by
            "#,
        )
        .bind(key)
        .bind(&stored)
        .bind(encrypted_flag)
        .execute(&self.db)
        .await?;

        let mut cache = self.cache.write().await;
        cache.insert(
            key.to_string(),
            CachedSetting {
                value: value.to_string(),
                expires_at: Utc::now() + self.cache_ttl,
            },
        );

        Ok(())
    }

    /// True when a non-empty value exists for the key (env or database).
    pub async fn is_configured(&self, key: &str) -> bool {
        matches!(self.get_setting(key).await, Ok(Some(v)) if !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::migrations::run_migrations;

    async fn service() -> SettingsService {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SettingsService::new(pool)
    }

    #[tokio::test]
    async fn missing_setting_is_none() {
        let settings = service().await;
        assert_eq!(
            settings.get_setting("does_not_exist_xyz").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let settings = service().await;
        settings
            .set_setting("gemini_model_test", "gemini-2.0-flash", false)
            .await
            .unwrap();
        assert_eq!(
            settings.get_setting("gemini_model_test").await.unwrap(),
            Some("gemini-2.0-flash".to_string())
        );
    }

    #[tokio::test]
    async fn get_setting_or_falls_back() {
        let settings = service().await;
        assert_eq!(
            settings
                .get_setting_or("absent_key_abc", "default-model")
                .await
                .unwrap(),
            "default-model"
        );
    }

    #[tokio::test]
    async fn overwrite_updates_value() {
        let settings = service().await;
        settings.set_setting("k_test", "one", false).await.unwrap();
        settings.set_setting("k_test", "two", false).await.unwrap();
        assert_eq!(
            settings.get_setting("k_test").await.unwrap(),
            Some("two".to_string())
        );
    }
}
