//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `VITALIS_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `VITALIS_SITE_URL` - Public URL for the site (e.g., `https://vitalis.se`)
//! - `VITALIS_DASHBOARD_PASSWORD` - Shared password for the editorial dashboard
//! - `VITALIS_BACKEND_URL` - Identity provider base URL
//! - `VITALIS_BACKEND_ANON_KEY` - Identity provider public API key
//!
//! ## Optional
//! - `VITALIS_HOST` - Bind address (default: 127.0.0.1)
//! - `VITALIS_PORT` - Listen port (default: 3000)
//! - `VITALIS_CONTENT_DIR` - Catalog and article directory (default: `crates/storefront/content`)
//! - `VITALIS_STATIC_DIR` - CSS and image directory served under `/static` (default: `crates/storefront/static`)
//! - `VITALIS_PROTECTED_CONTENT` - Comma-separated `type:id` keys that need approval
//! - `VITALIS_VERSION_RETENTION_DAYS` - Default cleanup age for content versions (default: 365)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::BTreeSet;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use vitalis_core::ContentKey;

const MIN_DASHBOARD_PASSWORD_LENGTH: usize = 12;

/// Default retention for content versions, in days.
pub const DEFAULT_VERSION_RETENTION_DAYS: u32 = 365;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "losenord",
    "xxx",
    "todo",
    "insert",
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
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public site URL, without trailing slash
    pub site_url: String,
    /// Shared editorial dashboard password
    pub dashboard_password: SecretString,
    /// Identity provider configuration
    pub backend: BackendConfig,
    /// Directory holding catalog JSON and markdown articles
    pub content_dir: PathBuf,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
    /// Content items that require approval before new versions are written
    pub protected_content: BTreeSet<ContentKey>,
    /// Default age threshold for version cleanup
    pub version_retention_days: u32,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Identity provider (auth backend) configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct BackendConfig {
    /// Base URL, e.g. `https://abc.backend.example`
    pub url: String,
    /// Public (anon) API key sent with every request
    pub anon_key: SecretString,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("anon_key", &"[REDACTED]")
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
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the dashboard password fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("VITALIS_DATABASE_URL")?;
        let host = get_env_or_default("VITALIS_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("VITALIS_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("VITALIS_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("VITALIS_PORT".to_string(), e.to_string()))?;
        let site_url = parse_site_url("VITALIS_SITE_URL", &get_required_env("VITALIS_SITE_URL")?)?;

        let dashboard_password = get_required_secret("VITALIS_DASHBOARD_PASSWORD")?;
        validate_dashboard_password(&dashboard_password, "VITALIS_DASHBOARD_PASSWORD")?;

        let backend = BackendConfig::from_env()?;
        let content_dir = PathBuf::from(get_env_or_default(
            "VITALIS_CONTENT_DIR",
            "crates/storefront/content",
        ));
        let static_dir = PathBuf::from(get_env_or_default(
            "VITALIS_STATIC_DIR",
            "crates/storefront/static",
        ));
        let protected_content = parse_protected_content(
            "VITALIS_PROTECTED_CONTENT",
            &get_env_or_default("VITALIS_PROTECTED_CONTENT", ""),
        )?;
        let version_retention_days = get_env_or_default(
            "VITALIS_VERSION_RETENTION_DAYS",
            &DEFAULT_VERSION_RETENTION_DAYS.to_string(),
        )
        .parse::<u32>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("VITALIS_VERSION_RETENTION_DAYS".to_string(), e.to_string())
        })?;

        Ok(Self {
            database_url,
            host,
            port,
            site_url,
            dashboard_password,
            backend,
            content_dir,
            static_dir,
            protected_content,
            version_retention_days,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the public site is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.site_url.starts_with("https://")
    }

    /// URL scheme of the public site (`https` or `http`).
    #[must_use]
    pub fn site_scheme(&self) -> &str {
        if self.is_secure() { "https" } else { "http" }
    }
}

impl BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = parse_site_url("VITALIS_BACKEND_URL", &get_required_env("VITALIS_BACKEND_URL")?)?;
        Ok(Self {
            url,
            anon_key: get_required_secret("VITALIS_BACKEND_ANON_KEY")?,
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

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
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
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate an absolute http(s) URL and strip any trailing slash.
fn parse_site_url(var_name: &str, value: &str) -> Result<String, ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Parse a comma-separated list of `type:id` content keys.
fn parse_protected_content(var_name: &str, value: &str) -> Result<BTreeSet<ContentKey>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<ContentKey>()
                .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))
        })
        .collect()
}

/// Validate that the dashboard password is long enough and not a placeholder.
fn validate_dashboard_password(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.chars().count() < MIN_DASHBOARD_PASSWORD_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {MIN_DASHBOARD_PASSWORD_LENGTH} characters (got {})",
                value.chars().count()
            ),
        ));
    }

    let lower = value.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(**p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    Ok(())
}
