// src/main.rs
use axum::routing::get;
use axum::{extract::Extension, middleware, Router};
use dotenv::dotenv;
use reqwest::Client;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::env;
use std::path::PathBuf;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod auth;
mod billing;
mod common;
mod credits;
mod generation;
mod health;
mod logging_middleware;
mod newsletter;
mod projects;
mod rate_limit_middleware;
mod services;

// ============================================================================
// COMMON IMPORTS
// ============================================================================

use common::{AppState, FeatureFlags};
use credits::CreditLedger;
use generation::orchestrator::GenerationOrchestrator;
use rate_limit_middleware::rate_limit_middleware;
use services::{
    BeehiivService, GeminiService, OpenAiService, RateLimiter, SettingsService, StripeService,
};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://ytza_api.db".to_string());
    let jwt_secret = match env::var("JWT_SECRET") {
        Ok(secret) if !secret.is_empty() => secret,
        _ => {
            warn!("JWT_SECRET not set - using an insecure development secret");
            "replace_with_strong_secret".to_string()
        }
    };

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let connect_options = SqliteConnectOptions::from_str(&database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;

    common::migrations::run_migrations(&pool).await?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    // Generous timeout: image generation regularly takes over a minute.
    let http_client = Client::builder()
        .timeout(std::time::Duration::from_secs(180))
        .build()?;

    let settings = Arc::new(SettingsService::new(pool.clone()));
    info!("SettingsService initialized");

    let openai = Arc::new(OpenAiService::new(settings.clone(), http_client.clone()));
    let gemini = Arc::new(GeminiService::new(settings.clone(), http_client.clone()));
    let stripe = Arc::new(StripeService::new(settings.clone(), http_client.clone()));
    let beehiiv = Arc::new(BeehiivService::new(settings.clone(), http_client.clone()));
    info!("Provider services initialized");

    let rate_limiter = Arc::new(RateLimiter::new());
    let credits = Arc::new(CreditLedger::new(pool.clone()));

    // The orchestrator owns the generation workflow; the Gemini service
    // doubles as content generator and prompt analyzer.
    let orchestrator = Arc::new(GenerationOrchestrator::new(
        pool.clone(),
        credits.clone(),
        openai.clone(),
        gemini.clone(),
        gemini.clone(),
    ));
    info!("Generation orchestrator initialized");

    // ========================================================================
    // FEATURE FLAGS
    // ========================================================================

    // Missing keys disable features rather than failing startup; the health
    // endpoint reports the resulting state.
    let features = FeatureFlags {
        openai: settings.is_configured("openai_api_key").await,
        gemini: settings.is_configured("gemini_api_key").await,
        stripe: settings.is_configured("stripe_secret_key").await,
        beehiiv: settings.is_configured("beehiiv_api_key").await,
    };

    if !features.config_valid() {
        warn!(
            openai = features.openai,
            gemini = features.gemini,
            "AI provider keys missing - generation features degraded"
        );
    }

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let app_state = AppState {
        db: pool,
        http: http_client,
        jwt_secret,
        features,
        settings,
        openai,
        gemini,
        stripe,
        beehiiv,
        rate_limiter,
        credits,
        orchestrator,
    };

    let shared = Arc::new(RwLock::new(app_state));

    // ========================================================================
    // ROUTER COMPOSITION
    // ========================================================================

    let app = Router::new()
        .merge(auth::auth_routes())
        .merge(generation::generation_routes())
        .merge(projects::projects_routes())
        .merge(billing::billing_routes())
        .merge(newsletter::newsletter_routes())
        .route("/api/health", get(health::health).head(health::health))
        // Request/response body logging in debug mode
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(middleware::from_fn(rate_limit_middleware))
        .layer(Extension(shared.clone()))
        .layer({
            let cors_origins = std::env::var("CORS_ORIGINS").unwrap_or_else(|_| {
                "http://localhost:3000,http://localhost:5173".to_string()
            });

            let origins: Vec<axum::http::HeaderValue> = cors_origins
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PATCH,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                ])
                .allow_credentials(true)
        })
        .layer(TraceLayer::new_for_http());

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
