//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `ESTATE_API_BASE_URL` - Backend API root (default: `http://127.0.0.1:8000/api/`)
//! - `ESTATE_HTTP_TIMEOUT_SECS` - Per-request timeout in seconds (default: 30)

use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api/";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Errors resolving an endpoint path against the API root.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// The path could not be joined onto the API root.
    #[error("invalid endpoint path: {0}")]
    Parse(#[from] url::ParseError),

    /// The path is an absolute URL, or resolves to another origin or above
    /// the API root. Requests to it would carry the bearer token elsewhere.
    #[error("endpoint {0:?} is outside the API root")]
    OutsideApiRoot(String),
}

/// Backend connection settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root every endpoint path is resolved against. Always ends in `/`.
    pub api_base_url: Url,
    /// Timeout applied to every backend request.
    pub http_timeout: Duration,
}

impl ClientConfig {
    /// Build a configuration for the given API root with default timeouts.
    ///
    /// A missing trailing slash is added so that relative endpoint paths
    /// resolve beneath the root instead of replacing its last segment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `base_url` is not an absolute
    /// http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: parse_base_url(base_url)?,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        })
    }

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

        let api_base_url =
            parse_base_url(&get_env_or_default("ESTATE_API_BASE_URL", DEFAULT_API_BASE_URL))?;
        let timeout_secs = get_optional_env("ESTATE_HTTP_TIMEOUT_SECS")
            .map(|raw| {
                raw.parse::<u64>().map_err(|e| {
                    ConfigError::InvalidEnvVar("ESTATE_HTTP_TIMEOUT_SECS".to_string(), e.to_string())
                })
            })
            .transpose()?
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);

        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "ESTATE_HTTP_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_base_url,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Resolve an endpoint path against the API root.
    ///
    /// Leading slashes are ignored, so `"/properties/"` and `"properties/"`
    /// address the same endpoint. Dot segments are resolved, but the result
    /// must stay on the API root's origin and beneath its path.
    ///
    /// # Errors
    ///
    /// Returns `EndpointError::OutsideApiRoot` for absolute URLs and for
    /// paths that escape the root, or `EndpointError::Parse` if the joined
    /// URL is invalid.
    pub fn endpoint_url(&self, path: &str) -> Result<Url, EndpointError> {
        let relative = path.trim_start_matches('/');
        let outside = || EndpointError::OutsideApiRoot(path.to_string());

        if Url::parse(relative).is_ok() {
            return Err(outside());
        }
        let url = self.api_base_url.join(relative)?;
        if url.origin() != self.api_base_url.origin()
            || !url.path().starts_with(self.api_base_url.path())
        {
            return Err(outside());
        }
        Ok(url)
    }

    /// Path of a resolved endpoint relative to the API root, without a
    /// leading slash.
    #[must_use]
    pub fn api_path<'a>(&self, url: &'a Url) -> &'a str {
        url.path()
            .strip_prefix(self.api_base_url.path())
            .unwrap_or_else(|| url.path())
    }

    /// Build the shared HTTP client.
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend cannot be initialised.
    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .timeout(self.http_timeout)
            .build()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar("ESTATE_API_BASE_URL".to_string(), reason);

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_appends_trailing_slash() {
        let config = ClientConfig::new("https://api.example.com/api").unwrap();
        assert_eq!(config.api_base_url.as_str(), "https://api.example.com/api/");
    }

    #[test]
    fn test_new_rejects_relative_and_non_http() {
        assert!(matches!(
            ClientConfig::new("/api/"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(matches!(
            ClientConfig::new("ftp://example.com/"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_endpoint_url_ignores_leading_slash() {
        let config = ClientConfig::new("http://localhost:8000/api/").unwrap();
        assert_eq!(
            config.endpoint_url("/accounts/login/").unwrap().as_str(),
            "http://localhost:8000/api/accounts/login/"
        );
        assert_eq!(
            config.endpoint_url("properties/3/").unwrap().as_str(),
            "http://localhost:8000/api/properties/3/"
        );
    }

    #[test]
    fn test_endpoint_url_rejects_other_hosts() {
        let config = ClientConfig::new("http://localhost:8000/api/").unwrap();

        for path in [
            "http://evil.example/api/properties/",
            "https://localhost:8000/api/properties/",
            "http://localhost:8001/api/properties/",
            "mailto:bob@example.com",
        ] {
            assert!(
                matches!(config.endpoint_url(path), Err(EndpointError::OutsideApiRoot(_))),
                "{path}"
            );
        }
    }

    #[test]
    fn test_endpoint_url_keeps_dot_segments_under_root() {
        let config = ClientConfig::new("http://localhost:8000/api/").unwrap();

        let url = config.endpoint_url("properties/../accounts/login/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/accounts/login/");
        assert_eq!(config.api_path(&url), "accounts/login/");

        assert!(matches!(
            config.endpoint_url("../admin/"),
            Err(EndpointError::OutsideApiRoot(_))
        ));
        assert!(matches!(
            config.endpoint_url("properties/%2e%2e/%2e%2e/admin/"),
            Err(EndpointError::OutsideApiRoot(_))
        ));
    }

    #[test]
    fn test_default_timeout() {
        let config = ClientConfig::new(DEFAULT_API_BASE_URL).unwrap();
        assert_eq!(config.http_timeout, Duration::from_secs(30));
    }
}
