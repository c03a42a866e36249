//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honoured for local development.

use crate::i18n::Language;
use std::env;
use std::time::Duration;

/// Default Cloud Functions region used by the Stripe extension.
const DEFAULT_FUNCTIONS_REGION: &str = "us-central1";

/// Default delay before retrying an operation after customer recovery.
const DEFAULT_RECOVERY_RETRY_DELAY_MS: u64 = 500;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Firebase / GCP project ID
    pub gcp_project_id: String,
    /// Region hosting the callable functions
    pub functions_region: String,
    /// Override for the callable base URL (set when using the emulator)
    pub functions_base_url: Option<String>,
    /// Origin of the web app, used to build portal/checkout return URLs
    pub app_origin: String,
    /// Fixed delay before the single retry after customer recovery
    pub recovery_retry_delay: Duration,
    /// Language used when no stored preference exists
    pub default_language: Language,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            functions_region: DEFAULT_FUNCTIONS_REGION.to_string(),
            functions_base_url: None,
            app_origin: "http://localhost:5173".to_string(),
            recovery_retry_delay: Duration::from_millis(DEFAULT_RECOVERY_RETRY_DELAY_MS),
            default_language: Language::English,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let gcp_project_id =
            env::var("GCP_PROJECT_ID").map_err(|_| ConfigError::Missing("GCP_PROJECT_ID"))?;
        let functions_region = env::var("FUNCTIONS_REGION")
            .unwrap_or_else(|_| DEFAULT_FUNCTIONS_REGION.to_string());

        // The functions emulator serves callables at /{project}/{region}/{name}
        let functions_base_url = env::var("FUNCTIONS_EMULATOR_HOST").ok().map(|host| {
            format!(
                "http://{}/{}/{}",
                host.trim_end_matches('/'),
                gcp_project_id,
                functions_region
            )
        });

        let recovery_retry_delay = match env::var("RECOVERY_RETRY_DELAY_MS") {
            Ok(raw) => Duration::from_millis(
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid("RECOVERY_RETRY_DELAY_MS", raw))?,
            ),
            Err(_) => Duration::from_millis(DEFAULT_RECOVERY_RETRY_DELAY_MS),
        };

        Ok(Self {
            gcp_project_id,
            functions_region,
            functions_base_url,
            app_origin: env::var("APP_ORIGIN")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            recovery_retry_delay,
            default_language: Language::from_preference(
                env::var("DEFAULT_LANGUAGE").ok().as_deref(),
            ),
        })
    }

    /// Base URL for callable functions.
    pub fn callable_base_url(&self) -> String {
        match &self.functions_base_url {
            Some(url) => url.clone(),
            None => format!(
                "https://{}-{}.cloudfunctions.net",
                self.functions_region, self.gcp_project_id
            ),
        }
    }

    /// Build an absolute URL back into the app, e.g. `/account?setup=complete`.
    pub fn app_url(&self, path: &str) -> String {
        format!("{}{}", self.app_origin, path)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
