//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `IDENTITY_API_BASE_URL` - Base URL of the identity/payments API
//! - `IDENTITY_API_KEY` - API key sent as `x-api-key` (high entropy)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `COURSE_SLUG` - Course sold on the landing page (default: the-only-choice)
//! - `AUTH_COOKIE_DOMAIN` - Parent domain for the login cookie (default: host-only)
//! - `AUTH_COOKIE_TTL_DAYS` - Login cookie lifetime, `0` for a session cookie (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Trace sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use only_choice_core::CourseSlug;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_COURSE_SLUG: &str = "the-only-choice";
const DEFAULT_COOKIE_TTL_DAYS: &str = "30";
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
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
    /// Course sold by the checkout buttons
    pub course_slug: CourseSlug,
    /// Identity API configuration
    pub identity: IdentityApiConfig,
    /// Login cookie settings
    pub auth_cookie: AuthCookieConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. "production")
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of requests traced
    pub sentry_traces_sample_rate: f32,
}

/// Identity API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct IdentityApiConfig {
    /// Base URL, e.g. `https://api.example.com/v1`
    pub base_url: Url,
    /// Key sent with every request
    pub api_key: SecretString,
}

impl std::fmt::Debug for IdentityApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl IdentityApiConfig {
    /// Absolute URL for an API path such as `user/otp/send`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Settings for the `consumerAuthToken` cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCookieConfig {
    /// Parent domain shared with the course platform; host-only when `None`
    pub domain: Option<String>,
    /// Cookie lifetime; a browser-session cookie when `None`
    pub ttl: Option<Duration>,
}

impl Default for AuthCookieConfig {
    fn default() -> Self {
        Self {
            domain: None,
            ttl: Some(Duration::from_secs(30 * SECONDS_PER_DAY)),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::load(&|key| std::env::var(key).ok())
    }

    /// Load configuration from an explicit set of variables.
    ///
    /// # Errors
    ///
    /// Same as [`StorefrontConfig::from_env`].
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::load(&|key| vars.get(key).cloned())
    }

    fn load(env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = get_env_or_default(env, "STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default(env, "STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_required_env(env, "STOREFRONT_BASE_URL")?;
        let course_slug = CourseSlug::parse(&get_env_or_default(
            env,
            "COURSE_SLUG",
            DEFAULT_COURSE_SLUG,
        ))
        .map_err(|e| ConfigError::InvalidEnvVar("COURSE_SLUG".to_string(), e.to_string()))?;

        let identity = IdentityApiConfig::load(env)?;
        let auth_cookie = AuthCookieConfig::load(env)?;

        Ok(Self {
            host,
            port,
            base_url,
            course_slug,
            identity,
            auth_cookie,
            sentry_dsn: get_optional_env(env, "SENTRY_DSN"),
            sentry_environment: get_optional_env(env, "SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_sample_rate(env, "SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: get_sample_rate(env, "SENTRY_TRACES_SAMPLE_RATE", 0.0)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl IdentityApiConfig {
    fn load(env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw = get_required_env(env, "IDENTITY_API_BASE_URL")?;
        let base_url = Url::parse(&raw).map_err(|e| {
            ConfigError::InvalidEnvVar("IDENTITY_API_BASE_URL".to_string(), e.to_string())
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "IDENTITY_API_BASE_URL".to_string(),
                format!("unsupported scheme '{}'", base_url.scheme()),
            ));
        }

        Ok(Self {
            base_url,
            api_key: get_validated_secret(env, "IDENTITY_API_KEY")?,
        })
    }
}

impl AuthCookieConfig {
    fn load(env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let domain = get_optional_env(env, "AUTH_COOKIE_DOMAIN")
            .map(|d| d.trim().trim_start_matches('.').to_string())
            .filter(|d| !d.is_empty());
        let days = get_env_or_default(env, "AUTH_COOKIE_TTL_DAYS", DEFAULT_COOKIE_TTL_DAYS)
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("AUTH_COOKIE_TTL_DAYS".to_string(), e.to_string())
            })?;
        let ttl = (days > 0).then(|| Duration::from_secs(days * SECONDS_PER_DAY));

        Ok(Self { domain, ttl })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(env: &dyn Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    env(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(env: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    env(key).filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(env: &dyn Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    get_optional_env(env, key).unwrap_or_else(|| default.to_string())
}

/// Parse a Sentry sample rate in `0.0..=1.0`.
fn get_sample_rate(
    env: &dyn Fn(&str) -> Option<String>,
    key: &str,
    default: f32,
) -> Result<f32, ConfigError> {
    let Some(raw) = get_optional_env(env, key) else {
        return Ok(default);
    };
    let rate = raw
        .parse::<f32>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be between 0.0 and 1.0".to_string(),
        ));
    }
    Ok(rate)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Real API keys have high entropy
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated key."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(
    env: &dyn Fn(&str) -> Option<String>,
    key: &str,
) -> Result<SecretString, ConfigError> {
    let value = get_required_env(env, key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
