//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `QRTAG_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `QRTAG_BASE_URL` - Public URL of the service
//! - `QRTAG_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `QRTAG_HOST` - Bind address (default: 127.0.0.1)
//! - `QRTAG_PORT` - Listen port (default: 3000)
//! - `QRTAG_STORAGE_BACKEND` - `local` or `http` (default: local)
//! - `QRTAG_STORAGE_DIR` - Root directory for the local backend (default: ./data/media)
//! - `QRTAG_STORAGE_URL` - Storage API base URL (required for `http`)
//! - `QRTAG_STORAGE_KEY` - Storage API service key (required for `http`)
//! - `QRTAG_STORAGE_BUCKET` - Bucket holding profile photos (default: `profile_pics`)
//! - `QRTAG_STORAGE_TIMEOUT_SECS` - Storage API request timeout (default: 30)
//! - `QRTAG_PHOTO_BUDGET_BYTES` - Maximum stored photo size (default: 307200)
//! - `QRTAG_MAX_UPLOAD_BYTES` - Request body limit for uploads (default: 10 MiB)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use crate::media::MediaSettings;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default bucket for profile photos.
pub const DEFAULT_PHOTO_BUCKET: &str = "profile_pics";

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

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the service
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Object storage configuration
    pub storage: StorageConfig,
    /// Photo encoding limits
    pub media: MediaSettings,
    /// Request body limit for photo uploads
    pub max_upload_bytes: usize,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Where profile photos are stored.
#[derive(Clone)]
pub enum StorageConfig {
    /// Files on local disk, served by this process under `/media`.
    Local {
        /// Root directory; buckets are subdirectories.
        root: PathBuf,
        /// Bucket holding profile photos.
        bucket: String,
    },
    /// A Supabase-compatible storage HTTP API.
    Http {
        /// API base URL, e.g. `https://project.supabase.co`.
        base_url: Url,
        /// Service key sent as a bearer token.
        api_key: SecretString,
        /// Bucket holding profile photos.
        bucket: String,
        /// Per-request timeout.
        timeout: Duration,
    },
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local { root, bucket } => f
                .debug_struct("Local")
                .field("root", root)
                .field("bucket", bucket)
                .finish(),
            Self::Http {
                base_url,
                bucket,
                timeout,
                ..
            } => f
                .debug_struct("Http")
                .field("base_url", &base_url.as_str())
                .field("api_key", &"[REDACTED]")
                .field("bucket", bucket)
                .field("timeout", timeout)
                .finish(),
        }
    }
}

impl ServerConfig {
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

        let database_url = get_database_url("QRTAG_DATABASE_URL")?;
        let host = parse_env("QRTAG_HOST", "127.0.0.1")?;
        let port = parse_env("QRTAG_PORT", "3000")?;
        let base_url = get_required_env("QRTAG_BASE_URL")?;
        let session_secret = get_validated_secret("QRTAG_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "QRTAG_SESSION_SECRET")?;

        let storage = StorageConfig::from_env()?;

        let defaults = MediaSettings::default();
        let media = MediaSettings {
            budget_bytes: parse_env(
                "QRTAG_PHOTO_BUDGET_BYTES",
                &defaults.budget_bytes.to_string(),
            )?,
            ..defaults
        };
        if media.budget_bytes == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "QRTAG_PHOTO_BUDGET_BYTES".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let max_upload_bytes = parse_env("QRTAG_MAX_UPLOAD_BYTES", "10485760")?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            storage,
            media,
            max_upload_bytes,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let bucket = get_env_or_default("QRTAG_STORAGE_BUCKET", DEFAULT_PHOTO_BUCKET);
        let backend = get_env_or_default("QRTAG_STORAGE_BACKEND", "local");

        match backend.as_str() {
            "local" => Ok(Self::Local {
                root: PathBuf::from(get_env_or_default("QRTAG_STORAGE_DIR", "./data/media")),
                bucket,
            }),
            "http" => {
                let raw_url = get_required_env("QRTAG_STORAGE_URL")?;
                let base_url = Url::parse(&raw_url).map_err(|e| {
                    ConfigError::InvalidEnvVar("QRTAG_STORAGE_URL".to_string(), e.to_string())
                })?;
                let timeout_secs: u64 = parse_env("QRTAG_STORAGE_TIMEOUT_SECS", "30")?;
                Ok(Self::Http {
                    base_url,
                    api_key: get_validated_secret("QRTAG_STORAGE_KEY")?,
                    bucket,
                    timeout: Duration::from_secs(timeout_secs),
                })
            }
            other => Err(ConfigError::InvalidEnvVar(
                "QRTAG_STORAGE_BACKEND".to_string(),
                format!("expected `local` or `http`, got `{other}`"),
            )),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
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
            #[allow(clippy::cast_precision_loss)]
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

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
