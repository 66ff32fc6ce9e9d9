// Common module - shared types and utilities across all modules

pub mod error;
pub mod helpers;
pub mod migrations;
pub mod sanitize;
pub mod state;
pub mod validation;

// Re-export commonly used types for convenience
pub use error::{ApiError, GenerationErrorKind};
pub use helpers::safe_email_log;
pub use state::{AppState, FeatureFlags};
pub use validation::{ValidationError, ValidationResult, Validator};
