//! Checkout configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `LARDER_API_URL` - Base URL of the storefront backend
//!
//! ## Optional
//! - `LARDER_CSRF_TOKEN` - CSRF token used until the backend sets a `csrftoken` cookie
//! - `LARDER_STATE_FILE` - Local state file (default: .larder/state.json)
//! - `LARDER_DEFAULT_DELIVERY_COST` - Cost used when delivery pricing fails (default: 300)
//! - `LARDER_DELIVERY_CACHE_TTL_SECS` - Delivery quote cache lifetime (default: 300)
//! - `LARDER_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: none)
//! - `LARDER_AUTHENTICATED` - Enable profile/address prefill (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use larder_core::Price;
use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_STATE_FILE: &str = ".larder/state.json";
const DEFAULT_DELIVERY_COST: &str = "300";
const DEFAULT_CACHE_TTL_SECS: &str = "300";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Complete checkout configuration.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Backend connection settings
    pub api: ApiConfig,
    /// Reconciler behaviour
    pub session: SessionSettings,
    /// Where local checkout state is persisted
    pub state_file: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Backend connection settings.
///
/// Implements `Debug` manually to redact the CSRF token.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL, always ending in `/`
    pub base_url: Url,
    /// Fallback CSRF token
    pub csrf_token: Option<SecretString>,
    /// Per-request timeout
    pub request_timeout: Option<Duration>,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field(
                "csrf_token",
                &self.csrf_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl ApiConfig {
    /// Settings for a backend at `base_url` with no token and no timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("LARDER_API_URL", base_url)?,
            csrf_token: None,
            request_timeout: None,
        })
    }
}

/// Reconciler behaviour.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Delivery cost substituted when pricing fails
    pub default_delivery_cost: Price,
    /// Lifetime of cached delivery quotes
    pub delivery_cache_ttl: Duration,
    /// Whether profile and saved-address prefill is available
    pub authenticated: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_delivery_cost: Price::from_units(300),
            delivery_cache_ttl: Duration::from_secs(300),
            authenticated: false,
        }
    }
}

impl CheckoutConfig {
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

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let base_url = parse_base_url("LARDER_API_URL", &env.required("LARDER_API_URL")?)?;
        let csrf_token = env.optional("LARDER_CSRF_TOKEN").map(SecretString::from);
        let request_timeout = env
            .optional("LARDER_REQUEST_TIMEOUT_SECS")
            .map(|raw| parse_value::<u64>("LARDER_REQUEST_TIMEOUT_SECS", &raw))
            .transpose()?
            .map(Duration::from_secs);

        let default_delivery_cost = parse_value::<Decimal>(
            "LARDER_DEFAULT_DELIVERY_COST",
            &env.or_default("LARDER_DEFAULT_DELIVERY_COST", DEFAULT_DELIVERY_COST),
        )?;
        if default_delivery_cost.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar(
                "LARDER_DEFAULT_DELIVERY_COST".to_string(),
                "must not be negative".to_string(),
            ));
        }
        let delivery_cache_ttl = parse_value::<u64>(
            "LARDER_DELIVERY_CACHE_TTL_SECS",
            &env.or_default("LARDER_DELIVERY_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS),
        )?;
        let authenticated = parse_flag(
            "LARDER_AUTHENTICATED",
            &env.or_default("LARDER_AUTHENTICATED", "false"),
        )?;

        Ok(Self {
            api: ApiConfig {
                base_url,
                csrf_token,
                request_timeout,
            },
            session: SessionSettings {
                default_delivery_cost: Price::new(default_delivery_cost),
                delivery_cache_ttl: Duration::from_secs(delivery_cache_ttl),
                authenticated,
            },
            state_file: PathBuf::from(env.or_default("LARDER_STATE_FILE", DEFAULT_STATE_FILE)),
            sentry_dsn: env.optional("SENTRY_DSN"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable. Blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

/// Parse a base URL, adding the trailing slash `Url::join` needs.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
