//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `LINKBIO_BASE_URL` - Public URL of the site
//! - `LINKBIO_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`; only for the `postgres` backend)
//!
//! ## Optional
//! - `LINKBIO_BACKEND` - `postgres` (default) or `memory`
//! - `LINKBIO_HOST` - Bind address (default: 127.0.0.1)
//! - `LINKBIO_PORT` - Listen port (default: 3000)
//! - `LINKBIO_PROFILE_NAME` - Public page heading (default: My Links)
//! - `LINKBIO_PROFILE_TAGLINE` - Public page subheading
//! - `LINKBIO_TOKEN_TTL_HOURS` - Sign-in token lifetime (default: 168)
//! - `LINKBIO_ADMIN_EMAIL` / `LINKBIO_ADMIN_PASSWORD` - Seed user for the
//!   `memory` backend
//! - `LINKBIO_LOG_FORMAT` - `pretty` (default) or `json`
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Trace sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};

use chrono::TimeDelta;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use linkbio_core::Email;

use crate::backend::password::MIN_PASSWORD_LENGTH;

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

/// Which backends serve identity and documents.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    /// `PostgreSQL` for documents, identity and sessions.
    Postgres {
        /// Connection URL (contains password)
        database_url: SecretString,
    },
    /// Everything in process; data is lost on restart.
    Memory {
        /// User created at startup, if any
        admin: Option<AdminSeed>,
    },
}

/// Credentials of the user seeded into the memory backend.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct AdminSeed {
    pub email: Email,
    pub password: SecretString,
}

impl std::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Text shown at the top of the public page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileConfig {
    pub name: String,
    pub tagline: String,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROFILE_NAME.to_owned(),
            tagline: DEFAULT_PROFILE_TAGLINE.to_owned(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

const DEFAULT_PROFILE_NAME: &str = "My Links";
const DEFAULT_PROFILE_TAGLINE: &str = "Check out my links 👇";
const DEFAULT_TOKEN_TTL_HOURS: i64 = 7 * 24;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct LinkbioConfig {
    /// Identity and document backends
    pub backend: BackendConfig,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// Public page heading
    pub profile: ProfileConfig,
    /// Lifetime of sign-in tokens
    pub token_ttl: TimeDelta,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

impl LinkbioConfig {
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
        let env = Env(lookup);

        let backend = match env.or_default("LINKBIO_BACKEND", "postgres").as_str() {
            "postgres" => BackendConfig::Postgres {
                database_url: env.database_url("LINKBIO_DATABASE_URL")?,
            },
            "memory" => BackendConfig::Memory {
                admin: env.admin_seed()?,
            },
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "LINKBIO_BACKEND".to_string(),
                    format!("expected 'postgres' or 'memory', got '{other}'"),
                ));
            }
        };

        let host = env.parsed("LINKBIO_HOST", "127.0.0.1")?;
        let port = env.parsed("LINKBIO_PORT", "3000")?;
        let base_url = env.required("LINKBIO_BASE_URL")?;

        let profile = ProfileConfig {
            name: env.or_default("LINKBIO_PROFILE_NAME", DEFAULT_PROFILE_NAME),
            tagline: env.or_default("LINKBIO_PROFILE_TAGLINE", DEFAULT_PROFILE_TAGLINE),
        };

        let ttl_hours: i64 = env.parsed(
            "LINKBIO_TOKEN_TTL_HOURS",
            &DEFAULT_TOKEN_TTL_HOURS.to_string(),
        )?;
        let token_ttl = TimeDelta::try_hours(ttl_hours)
            .filter(|ttl| *ttl > TimeDelta::zero())
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "LINKBIO_TOKEN_TTL_HOURS".to_string(),
                    format!("must be a positive number of hours, got {ttl_hours}"),
                )
            })?;

        let log_format = match env.or_default("LINKBIO_LOG_FORMAT", "pretty").as_str() {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "LINKBIO_LOG_FORMAT".to_string(),
                    format!("expected 'pretty' or 'json', got '{other}'"),
                ));
            }
        };

        Ok(Self {
            backend,
            host,
            port,
            base_url,
            profile,
            token_ttl,
            log_format,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: env.parsed("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: env.parsed("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get a required environment variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional environment variable. Empty counts as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.is_empty())
    }

    /// Get an environment variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse an environment variable, falling back to a default.
    fn parsed<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Get database URL with fallback to generic `DATABASE_URL`.
    fn database_url(&self, primary_key: &str) -> Result<SecretString, ConfigError> {
        self.optional(primary_key)
            .or_else(|| self.optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
    }

    /// Seed user for the memory backend. Both variables or neither.
    fn admin_seed(&self) -> Result<Option<AdminSeed>, ConfigError> {
        let email = self.optional("LINKBIO_ADMIN_EMAIL");
        let password = self.optional("LINKBIO_ADMIN_PASSWORD").map(SecretString::from);

        match (email, password) {
            (None, None) => Ok(None),
            (Some(_), None) => Err(ConfigError::MissingEnvVar(
                "LINKBIO_ADMIN_PASSWORD".to_string(),
            )),
            (None, Some(_)) => Err(ConfigError::MissingEnvVar(
                "LINKBIO_ADMIN_EMAIL".to_string(),
            )),
            (Some(email), Some(password)) => {
                let email = Email::parse(&email).map_err(|e| {
                    ConfigError::InvalidEnvVar("LINKBIO_ADMIN_EMAIL".to_string(), e.to_string())
                })?;
                validate_password(&password, "LINKBIO_ADMIN_PASSWORD")?;
                Ok(Some(AdminSeed { email, password }))
            }
        }
    }
}

/// Validate that a password meets minimum length requirements.
fn validate_password(password: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let length = password.expose_secret().chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {MIN_PASSWORD_LENGTH} characters (got {length})"),
        ));
    }
    Ok(())
}
