// src/common/migrations.rs
//! Database schema management

use sqlx::SqlitePool;
use std::env;
use tracing::{info, warn};

/// Run all database migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Only drop tables if RESET_DB is set to "true". Prevents data loss on
    // ordinary restarts.
    let should_reset_db = env::var("RESET_DB").unwrap_or_else(|_| "false".to_string()) == "true";

    if should_reset_db {
        warn!("RESET_DB=true - dropping all tables and recreating schema");
        drop_all_tables(pool).await?;
    }

    create_user_tables(pool).await?;
    create_project_tables(pool).await?;
    create_billing_tables(pool).await?;
    create_system_tables(pool).await?;
    create_indexes(pool).await?;

    info!("Database migration completed");

    Ok(())
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for table in [
        "purchases",
        "projects",
        "user_credits",
        "users",
        "system_settings",
    ] {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await?;
    }
    Ok(())
}

async fn create_user_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            full_name TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    // balance is guarded by a CHECK constraint; debits go through the
    // conditional UPDATE in CreditLedger so the constraint should never
    // actually trip.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_credits (
            user_id TEXT PRIMARY KEY REFERENCES users(id),
            balance INTEGER NOT NULL DEFAULT 0 CHECK (balance >= 0),
            subscription_tier TEXT NOT NULL DEFAULT 'free',
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_project_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            selected_style_id TEXT NOT NULL,
            thumbnail_storage_path TEXT NOT NULL,
            generated_yt_title TEXT,
            generated_yt_description TEXT,
            generated_yt_tags TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_billing_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // stripe_session_id is UNIQUE so a replayed webhook or a verify-payment
    // retry cannot grant credits twice for the same checkout.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS purchases (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            amount_cents INTEGER NOT NULL,
            credits_added INTEGER NOT NULL,
            purchase_type TEXT NOT NULL,
            payment_method_last4 TEXT,
            stripe_session_id TEXT UNIQUE,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_system_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS system_settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            encrypted INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_by TEXT NOT NULL DEFAULT 'system'
        )
        "#,
    )
    .execute(pool)
    .await?;

    init_default_settings(pool).await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for stmt in [
        "CREATE INDEX IF NOT EXISTS idx_projects_user ON projects(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_projects_user_style ON projects(user_id, selected_style_id, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_purchases_user ON purchases(user_id, created_at)",
    ] {
        sqlx::query(stmt).execute(pool).await?;
    }
    Ok(())
}

/// Seed provider settings from environment variables on first boot.
/// Existing rows are never overwritten; env vars still take precedence at
/// read time through SettingsService.
async fn init_default_settings(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let seeds = [
        ("openai_api_key", "OPENAI_API_KEY"),
        ("openai_base_url", "OPENAI_BASE_URL"),
        ("openai_image_model", "OPENAI_IMAGE_MODEL"),
        ("gemini_api_key", "GEMINI_API_KEY"),
        ("gemini_model", "GEMINI_MODEL"),
        ("stripe_secret_key", "STRIPE_SECRET_KEY"),
        ("stripe_webhook_secret", "STRIPE_WEBHOOK_SECRET"),
        ("stripe_price_id", "STRIPE_PRICE_ID"),
        ("beehiiv_api_key", "BEEHIIV_API_KEY"),
        ("beehiiv_publication_id", "BEEHIIV_PUBLICATION_ID"),
    ];

    for (db_key, env_key) in seeds {
        let Ok(value) = env::var(env_key) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }

        let existing: Option<(String,)> =
            sqlx::query_as("SELECT value FROM system_settings WHERE key = ?")
                .bind(db_key)
                .fetch_optional(pool)
                .await?;

        if existing.is_none() {
            sqlx::query(
                r#"
                INSERT INTO system_settings (key, value, encrypted, updated_at, updated_by)
                VALUES (?, ?, 0, datetime('now'), 'system')
                "#,
            )
            .bind(db_key)
            .bind(&value)
            .execute(pool)
            .await?;

            info!(key = %db_key, "Initialized setting from environment variable");
        }
    }

    Ok(())
}
