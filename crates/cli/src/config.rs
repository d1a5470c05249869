//! CLI settings loaded from environment variables.
//!
//! Backend settings (`ESTATE_API_BASE_URL`, `ESTATE_HTTP_TIMEOUT_SECS`) are
//! read by [`estate_client::ClientConfig::from_env`]; this module covers
//! the rest.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `ESTATE_SESSION_FILE` - Where the session and favourites are stored (default: `.estate-session.json`)
//! - `ESTATE_LOG_JSON` - Emit logs as JSON lines when set to `1` or `true`
//! - `SENTRY_DSN` - Sentry DSN for error tracking
//! - `SENTRY_ENVIRONMENT` - Environment name reported to Sentry

use std::path::PathBuf;

use thiserror::Error;

const DEFAULT_SESSION_FILE: &str = ".estate-session.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Process-level settings.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Backing file for the key-value store.
    pub session_file: PathBuf,
    /// Structured JSON log output.
    pub log_json: bool,
    /// Sentry DSN; error tracking is off when absent.
    pub sentry_dsn: Option<String>,
    /// Sentry environment name.
    pub sentry_environment: Option<String>,
}

impl CliConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let session_file = PathBuf::from(get_env_or_default(
            "ESTATE_SESSION_FILE",
            DEFAULT_SESSION_FILE,
        ));
        let log_json = get_optional_env("ESTATE_LOG_JSON")
            .map(|raw| parse_flag("ESTATE_LOG_JSON", &raw))
            .transpose()?
            .unwrap_or(false);

        Ok(Self {
            session_file,
            log_json,
            sentry_dsn: get_optional_env("SENTRY_DSN").filter(|dsn| !dsn.is_empty()),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(matches!(parse_flag("X", "TRUE"), Ok(true)));
        assert!(matches!(parse_flag("X", "1"), Ok(true)));
        assert!(matches!(parse_flag("X", "off"), Ok(false)));
        assert!(matches!(parse_flag("X", ""), Ok(false)));
        assert!(matches!(
            parse_flag("X", "maybe"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }
}
