//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CARTBRIDGE_CATALOG_PATH` - Path to the product catalog JSON file
//!
//! ## Optional
//! - `CARTBRIDGE_HOST` - Bind address (default: 127.0.0.1)
//! - `CARTBRIDGE_PORT` - Listen port (default: 3000)
//! - `CARTBRIDGE_BASE_URL` - Public URL (default: <http://localhost:3000>)
//! - `CART_SERVICE_URL` - Remote cart API base URL (default: in-process cart service)
//! - `CART_SERVICE_TIMEOUT_MS` - Remote cart API request timeout (default: 10000)
//! - `CART_MERGE_SETTLE_DELAY_MS` - Wait between merge-in and re-fetch (default: 500)
//! - `CART_SESSION_IDLE_SECS` - Session and per-shopper engine idle window (default: 7 days)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::cart::EngineConfig;

const DEFAULT_SESSION_IDLE_SECS: &str = "604800";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Product catalog file
    pub catalog_path: PathBuf,
    /// Remote cart API; `None` selects the in-process cart service
    pub cart_service: Option<CartServiceConfig>,
    /// Reconciliation engine tuning
    pub engine: EngineConfig,
    /// Inactivity window after which a shopper's session and engine are dropped
    pub session_idle: Duration,
    /// Error tracking configuration
    pub sentry: SentryConfig,
}

/// Remote cart API configuration.
#[derive(Debug, Clone)]
pub struct CartServiceConfig {
    /// Base URL; request paths are appended to it
    pub url: Url,
    /// Per-request timeout
    pub timeout: Duration,
}

/// Sentry configuration.
///
/// Implements `Debug` manually to redact the DSN.
#[derive(Clone)]
pub struct SentryConfig {
    /// Sentry DSN; error tracking is disabled when absent
    pub dsn: Option<SecretString>,
    /// Environment name reported with events
    pub environment: Option<String>,
    /// Error event sample rate (0.0 - 1.0)
    pub sample_rate: f32,
    /// Transaction sample rate (0.0 - 1.0)
    pub traces_sample_rate: f32,
}

impl std::fmt::Debug for SentryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentryConfig")
            .field("dsn", &self.dsn.as_ref().map(|_| "[REDACTED]"))
            .field("environment", &self.environment)
            .field("sample_rate", &self.sample_rate)
            .field("traces_sample_rate", &self.traces_sample_rate)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env::<IpAddr>(
            "CARTBRIDGE_HOST",
            &get_env_or_default("CARTBRIDGE_HOST", "127.0.0.1"),
        )?;
        let port = parse_env::<u16>(
            "CARTBRIDGE_PORT",
            &get_env_or_default("CARTBRIDGE_PORT", "3000"),
        )?;
        let base_url = get_env_or_default("CARTBRIDGE_BASE_URL", "http://localhost:3000");
        let catalog_path = PathBuf::from(get_required_env("CARTBRIDGE_CATALOG_PATH")?);

        let cart_service = CartServiceConfig::from_env()?;

        let settle_ms = parse_env::<u64>(
            "CART_MERGE_SETTLE_DELAY_MS",
            &get_env_or_default("CART_MERGE_SETTLE_DELAY_MS", "500"),
        )?;
        let engine = EngineConfig {
            settle_delay: Duration::from_millis(settle_ms),
        };

        let idle_secs = parse_env::<u64>(
            "CART_SESSION_IDLE_SECS",
            &get_env_or_default("CART_SESSION_IDLE_SECS", DEFAULT_SESSION_IDLE_SECS),
        )?;
        if idle_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CART_SESSION_IDLE_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            host,
            port,
            base_url,
            catalog_path,
            cart_service,
            engine,
            session_idle: Duration::from_secs(idle_secs),
            sentry: SentryConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl CartServiceConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(raw) = get_optional_env("CART_SERVICE_URL") else {
            return Ok(None);
        };
        let url = parse_env::<Url>("CART_SERVICE_URL", &raw)?;
        let timeout_ms = parse_env::<u64>(
            "CART_SERVICE_TIMEOUT_MS",
            &get_env_or_default("CART_SERVICE_TIMEOUT_MS", "10000"),
        )?;
        Ok(Some(Self {
            url,
            timeout: Duration::from_millis(timeout_ms),
        }))
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN").map(SecretString::from),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_sample_rate(
                "SENTRY_SAMPLE_RATE",
                &get_env_or_default("SENTRY_SAMPLE_RATE", "1.0"),
            )?,
            traces_sample_rate: parse_sample_rate(
                "SENTRY_TRACES_SAMPLE_RATE",
                &get_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0"),
            )?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a raw value, naming the variable in the error.
fn parse_env<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a sample rate and check it lies in `0.0..=1.0`.
fn parse_sample_rate(key: &str, raw: &str) -> Result<f32, ConfigError> {
    let rate = parse_env::<f32>(key, raw)?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 0.0 and 1.0 (got {rate})"),
        ));
    }
    Ok(rate)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sentry() -> SentryConfig {
        SentryConfig {
            dsn: Some(SecretString::from("https://key@sentry.example.com/1")),
            environment: Some("staging".to_string()),
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
        }
    }

    #[test]
    fn test_parse_env_reports_variable() {
        let err = parse_env::<u16>("CARTBRIDGE_PORT", "eighty").unwrap_err();
        match err {
            ConfigError::InvalidEnvVar(key, _) => assert_eq!(key, "CARTBRIDGE_PORT"),
            ConfigError::MissingEnvVar(_) => panic!("wrong error"),
        }
        assert_eq!(parse_env::<u16>("CARTBRIDGE_PORT", " 8080 ").unwrap(), 8080);
    }

    #[test]
    fn test_parse_env_url() {
        let url = parse_env::<Url>("CART_SERVICE_URL", "https://carts.example.com/v1").unwrap();
        assert_eq!(url.host_str(), Some("carts.example.com"));
        assert!(parse_env::<Url>("CART_SERVICE_URL", "not a url").is_err());
    }

    #[test]
    fn test_parse_sample_rate_bounds() {
        assert!((parse_sample_rate("R", "0.25").unwrap() - 0.25).abs() < f32::EPSILON);
        assert!(parse_sample_rate("R", "1.5").is_err());
        assert!(parse_sample_rate("R", "-0.1").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            catalog_path: PathBuf::from("catalog.json"),
            cart_service: None,
            engine: EngineConfig::default(),
            session_idle: Duration::from_secs(60),
            sentry: sentry(),
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_sentry_config_debug_redacts_dsn() {
        let debug_output = format!("{:?}", sentry());

        assert!(debug_output.contains("staging"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("sentry.example.com"));
    }
}
