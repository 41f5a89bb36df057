//! Application configuration loaded from environment variables.
//!
//! Cloud Run injects secrets as environment variables via secret bindings,
//! so everything is read once at startup.

use chrono::{FixedOffset, Offset, Utc};
use std::env;
use std::time::Duration;

/// Default overall budget for one badge evaluation.
const DEFAULT_EVALUATION_TIMEOUT_SECS: u64 = 10;
/// Default budget for a single data-source fetch inside an evaluation.
const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 4;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL (CORS)
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Offset used for calendar days, months and time-of-day rules
    pub local_offset: FixedOffset,
    /// Overall timeout for one evaluation triggered by a client
    pub evaluation_timeout: Duration,
    /// Timeout for each data-source fetch inside an evaluation
    pub source_timeout: Duration,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            local_offset: Utc.fix(),
            evaluation_timeout: Duration::from_secs(DEFAULT_EVALUATION_TIMEOUT_SECS),
            source_timeout: Duration::from_secs(DEFAULT_SOURCE_TIMEOUT_SECS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// For local development, a `.env` file is loaded if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let offset_minutes: i32 = parse_or("LOCAL_UTC_OFFSET_MINUTES", 0)?;
        let local_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or(ConfigError::Invalid("LOCAL_UTC_OFFSET_MINUTES"))?;

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: parse_or("PORT", 8080)?,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            local_offset,
            evaluation_timeout: Duration::from_secs(parse_or(
                "EVALUATION_TIMEOUT_SECS",
                DEFAULT_EVALUATION_TIMEOUT_SECS,
            )?),
            source_timeout: Duration::from_secs(parse_or(
                "SOURCE_TIMEOUT_SECS",
                DEFAULT_SOURCE_TIMEOUT_SECS,
            )?),
        })
    }
}

/// Parse an optional environment variable, falling back to `default` when unset.
fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
