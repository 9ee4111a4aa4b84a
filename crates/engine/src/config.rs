//! Sync engine configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SYNC_REMOTE_BASE_URL` - Base URL of the remote cart/wishlist/catalog API
//!
//! ## Optional
//! - `SYNC_REMOTE_API_TOKEN` - Bearer token for the remote API
//! - `SYNC_EVENTS_URL` - NDJSON push-event stream URL
//! - `SYNC_STORE_DIR` - Local store directory (default: .storefront-sync)
//! - `SYNC_STORE_NAMESPACE` - Local store key namespace (default: storefront)
//! - `SYNC_DEBOUNCE_MS` - Quiet period before a push is sent (default: 2000)
//! - `SYNC_REQUEST_TIMEOUT_SECS` - Remote request timeout (default: 10)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Default quiet period before a debounced push fires.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(2000);

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "put-your",
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

/// Sync engine configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Remote store and catalog API
    pub remote: RemoteConfig,
    /// Directory holding the file-backed local store
    pub store_dir: PathBuf,
    /// Prefix for every local store key
    pub store_namespace: String,
    /// Quiet period before a cart or wishlist push fires
    pub debounce: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Remote API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct RemoteConfig {
    /// Base URL (e.g., `https://api.example.com/api/`)
    pub base_url: Url,
    /// Bearer token, if the API requires one
    pub api_token: Option<SecretString>,
    /// NDJSON event stream endpoint
    pub events_url: Option<Url>,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("events_url", &self.events_url.as_ref().map(Url::as_str))
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            store_dir: PathBuf::from(".storefront-sync"),
            store_namespace: "storefront".to_string(),
            debounce: DEFAULT_DEBOUNCE,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://127.0.0.1:5000/api/")
                .expect("default base URL is a valid absolute URL"),
            api_token: None,
            events_url: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, or
    /// if the API token looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_source(&|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`SyncConfig::from_env`].
    pub fn from_source(source: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = parse_base_url(
            "SYNC_REMOTE_BASE_URL",
            &required(source, "SYNC_REMOTE_BASE_URL")?,
        )?;
        let api_token = match source("SYNC_REMOTE_API_TOKEN") {
            Some(token) => {
                validate_secret_strength(&token, "SYNC_REMOTE_API_TOKEN")?;
                Some(SecretString::from(token))
            }
            None => None,
        };
        let events_url = source("SYNC_EVENTS_URL")
            .map(|raw| {
                Url::parse(&raw).map_err(|e| {
                    ConfigError::InvalidEnvVar("SYNC_EVENTS_URL".to_string(), e.to_string())
                })
            })
            .transpose()?;
        let request_timeout =
            Duration::from_secs(parse_or_default(source, "SYNC_REQUEST_TIMEOUT_SECS", 10)?);

        let store_dir = PathBuf::from(or_default(source, "SYNC_STORE_DIR", ".storefront-sync"));
        let store_namespace = or_default(source, "SYNC_STORE_NAMESPACE", "storefront");
        if store_namespace.is_empty() || store_namespace.contains(['/', '\\']) {
            return Err(ConfigError::InvalidEnvVar(
                "SYNC_STORE_NAMESPACE".to_string(),
                "must be non-empty and contain no path separators".to_string(),
            ));
        }
        let debounce = Duration::from_millis(parse_or_default(source, "SYNC_DEBOUNCE_MS", 2000)?);

        Ok(Self {
            remote: RemoteConfig {
                base_url,
                api_token,
                events_url,
                request_timeout,
            },
            store_dir,
            store_namespace,
            debounce,
            sentry_dsn: source("SENTRY_DSN"),
            sentry_environment: source("SENTRY_ENVIRONMENT"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required variable.
fn required(source: &dyn Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    source(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a variable with a default value.
fn or_default(source: &dyn Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    source(key).unwrap_or_else(|| default.to_string())
}

/// Parse a numeric variable, falling back to `default` when unset.
fn parse_or_default(
    source: &dyn Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    source(key).map_or(Ok(default), |raw| {
        raw.parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse the API base URL. A trailing slash is added so relative joins
/// append to the path instead of replacing its last segment.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    let url = Url::parse(&normalized)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }
    Ok(url)
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

    #[allow(clippy::cast_precision_loss)]
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject tokens that are obviously copied from a template.
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

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"),
        ));
    }

    Ok(())
}
