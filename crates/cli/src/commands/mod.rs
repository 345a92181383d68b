//! CLI command implementations.

pub mod migrate;
pub mod user;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use linkbio_web::backend::AuthError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Password does not meet the minimum length.
    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),

    /// User already exists.
    #[error("User already exists with email: {0}")]
    UserExists(String),

    /// No such user.
    #[error("No user with email: {0}")]
    UserNotFound(String),

    /// Identity provider error.
    #[error("Identity error: {0}")]
    Identity(#[from] AuthError),
}

/// The database URL, from `LINKBIO_DATABASE_URL` or `DATABASE_URL`.
fn database_url() -> Result<SecretString, CommandError> {
    std::env::var("LINKBIO_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("LINKBIO_DATABASE_URL"))
}

/// Connect to the configured database.
async fn connect() -> Result<PgPool, CommandError> {
    let database_url = database_url()?;
    tracing::info!("Connecting to database...");
    Ok(linkbio_web::db::create_pool(&database_url).await?)
}
