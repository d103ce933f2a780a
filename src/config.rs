//! Configuration for taskgate.
//!
//! Everything comes from environment variables:
//! - `GEMINI_API_KEY` - Required. API key for the Google Generative Language API.
//! - `SCORER_MODEL` - Optional. Model used for the interrogation. Defaults to `gemini-1.5-flash`.
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `SCORER_TIMEOUT_SECS` - Optional. Per-request timeout on scorer calls. Defaults to `30`.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Gemini API key
    pub api_key: String,

    /// Model identifier for the reflective interrogation
    pub scorer_model: String,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Timeout applied to every scorer request
    pub scorer_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `GEMINI_API_KEY` is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;

        let scorer_model =
            std::env::var("SCORER_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".to_string());

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let timeout_secs: u64 = std::env::var("SCORER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|e| {
                ConfigError::InvalidValue("SCORER_TIMEOUT_SECS".to_string(), format!("{}", e))
            })?;

        Ok(Config {
            api_key,
            scorer_model,
            host,
            port,
            scorer_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, scorer_model: String) -> Self {
        Self {
            api_key,
            scorer_model,
            host: "127.0.0.1".to_string(),
            port: 3000,
            scorer_timeout: Duration::from_secs(30),
        }
    }
}
