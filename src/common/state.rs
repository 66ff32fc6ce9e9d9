// Application state shared across all modules

use reqwest::Client;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::credits::CreditLedger;
use crate::generation::orchestrator::GenerationOrchestrator;
use crate::services::{
    BeehiivService, GeminiService, OpenAiService, RateLimiter, SettingsService, StripeService,
};

/// Which provider integrations are usable with the current configuration.
///
/// Computed once at startup. A missing key disables the feature and is
/// reported by the health endpoint instead of failing the process.
#[derive(Debug, Clone, Copy)]
pub struct FeatureFlags {
    pub openai: bool,
    pub gemini: bool,
    pub stripe: bool,
    pub beehiiv: bool,
}

impl FeatureFlags {
    /// The two AI providers are the product; billing and newsletter are
    /// operational extras.
    pub fn config_valid(&self) -> bool {
        self.openai && self.gemini
    }
}

/// Application state containing the database pool, services, and
/// configuration. Everything that used to be a module-level singleton
/// (rate-limit store, provider keys, feature flags) lives here and is
/// constructed once in `main`.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub http: Client,
    pub jwt_secret: String,
    pub features: FeatureFlags,
    pub settings: Arc<SettingsService>,
    pub openai: Arc<OpenAiService>,
    pub gemini: Arc<GeminiService>,
    pub stripe: Arc<StripeService>,
    pub beehiiv: Arc<BeehiivService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub credits: Arc<CreditLedger>,
    pub orchestrator: Arc<GenerationOrchestrator>,
}

#[cfg(test)]
impl AppState {
    /// Fully wired state over an in-memory pool. The provider services are
    /// real but unconfigured, so tests that reach them get NotConfigured
    /// errors instead of network calls.
    pub fn for_tests(db: SqlitePool) -> Self {
        let http = Client::new();
        let settings = Arc::new(SettingsService::new(db.clone()));
        let openai = Arc::new(OpenAiService::new(settings.clone(), http.clone()));
        let gemini = Arc::new(GeminiService::new(settings.clone(), http.clone()));
        let credits = Arc::new(CreditLedger::new(db.clone()));
        let orchestrator = Arc::new(GenerationOrchestrator::new(
            db.clone(),
            credits.clone(),
            openai.clone(),
            gemini.clone(),
            gemini.clone(),
        ));

        Self {
            db,
            http: http.clone(),
            jwt_secret: "test-secret".to_string(),
            features: FeatureFlags {
                openai: false,
                gemini: false,
                stripe: false,
                beehiiv: false,
            },
            settings: settings.clone(),
            stripe: Arc::new(StripeService::new(settings.clone(), http.clone())),
            beehiiv: Arc::new(BeehiivService::new(settings, http)),
            rate_limiter: Arc::new(RateLimiter::new()),
            openai,
            gemini,
            credits,
            orchestrator,
        }
    }
}
