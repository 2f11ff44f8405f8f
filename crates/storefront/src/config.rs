//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `SHOPKEEP_API_URL` - API origin (default: `http://localhost:5000`)
//! - `SHOPKEEP_DATA_DIR` - Directory for guest cart/favorites (default: `.shopkeep`)
//! - `SHOPKEEP_PRODUCT_CACHE_TTL_SECS` - Catalog cache TTL (default: 300)
//! - `SHOPKEEP_GUEST_MAX_AGE_DAYS` - Guest data staleness tolerance (default: 30)
//! - `SHOPKEEP_API_TOKEN` - Bearer token for an authenticated session
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:5000";
const DEFAULT_DATA_DIR: &str = ".shopkeep";
const DEFAULT_PRODUCT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_GUEST_MAX_AGE_DAYS: i64 = 30;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct ClientConfig {
    /// API origin all endpoints are resolved against
    pub api_url: Url,
    /// Directory backing the guest key-value store
    pub data_dir: PathBuf,
    /// How long catalog reads stay cached
    pub product_cache_ttl: Duration,
    /// Guest data older than this is discarded on load
    pub guest_max_age: chrono::Duration,
    /// Bearer token for an already authenticated session
    pub api_token: Option<SecretString>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url.as_str())
            .field("data_dir", &self.data_dir)
            .field("product_cache_ttl", &self.product_cache_ttl)
            .field("guest_max_age", &self.guest_max_age)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_dsn", &self.sentry_dsn)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            product_cache_ttl: Duration::from_secs(DEFAULT_PRODUCT_CACHE_TTL_SECS),
            guest_max_age: chrono::Duration::days(DEFAULT_GUEST_MAX_AGE_DAYS),
            api_token: None,
            sentry_dsn: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url(&get_env_or_default("SHOPKEEP_API_URL", DEFAULT_API_URL))?;
        let data_dir = PathBuf::from(get_env_or_default("SHOPKEEP_DATA_DIR", DEFAULT_DATA_DIR));
        let product_cache_ttl = Duration::from_secs(get_parsed_env(
            "SHOPKEEP_PRODUCT_CACHE_TTL_SECS",
            DEFAULT_PRODUCT_CACHE_TTL_SECS,
        )?);
        let guest_max_age = chrono::Duration::days(get_parsed_env(
            "SHOPKEEP_GUEST_MAX_AGE_DAYS",
            DEFAULT_GUEST_MAX_AGE_DAYS,
        )?);
        let api_token = get_optional_env("SHOPKEEP_API_TOKEN").map(SecretString::from);
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            api_url,
            data_dir,
            product_cache_ttl,
            guest_max_age,
            api_token,
            sentry_dsn,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

#[allow(clippy::expect_used)] // constant, covered by tests
fn default_api_url() -> Url {
    Url::parse(DEFAULT_API_URL).expect("default API URL is valid")
}

/// Parse and validate the API origin.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| {
        ConfigError::InvalidEnvVar("SHOPKEEP_API_URL".to_string(), e.to_string())
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "SHOPKEEP_API_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            "SHOPKEEP_API_URL".to_string(),
            "must be an absolute origin".to_string(),
        ));
    }
    Ok(url)
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn get_parsed_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |value| {
        value
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_api_url_is_local() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url.as_str(), "http://localhost:5000/");
        assert_eq!(config.product_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.guest_max_age, chrono::Duration::days(30));
    }

    #[test]
    fn test_parse_api_url_rejects_other_schemes() {
        let result = parse_api_url("ftp://example.com");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_parse_api_url_rejects_garbage() {
        assert!(parse_api_url("not a url").is_err());
    }

    #[test]
    fn test_parse_api_url_accepts_https() {
        let url = parse_api_url("https://api.shop.example/").unwrap();
        assert_eq!(url.host_str(), Some("api.shop.example"));
    }

    #[test]
    fn test_config_debug_redacts_token() {
        let config = ClientConfig {
            api_token: Some(SecretString::from("super_secret_token_value")),
            ..ClientConfig::default()
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("localhost:5000"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_token_value"));
    }
}
