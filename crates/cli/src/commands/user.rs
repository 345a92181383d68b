//! Identity user management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a user (password from LINKBIO_USER_PASSWORD or --password)
//! linkbio-cli user create -e admin@example.com
//!
//! # Delete a user
//! linkbio-cli user delete -e admin@example.com
//! ```
//!
//! # Environment Variables
//!
//! - `LINKBIO_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `LINKBIO_USER_PASSWORD` - Password for `user create`

use chrono::TimeDelta;
use secrecy::{ExposeSecret, SecretString};

use linkbio_core::Email;
use linkbio_web::backend::AuthError;
use linkbio_web::backend::password::MIN_PASSWORD_LENGTH;
use linkbio_web::backend::postgres::PgIdentityProvider;

use super::{CommandError, connect};

/// These commands never issue credentials.
const UNUSED_TOKEN_TTL: TimeDelta = TimeDelta::hours(1);

fn parse_email(email: &str) -> Result<Email, CommandError> {
    Email::parse(email.trim()).map_err(|_| CommandError::InvalidEmail(email.to_owned()))
}

fn check_password(password: &SecretString) -> Result<(), CommandError> {
    if password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
        return Err(CommandError::WeakPassword(MIN_PASSWORD_LENGTH));
    }
    Ok(())
}

/// Create a new identity user.
///
/// # Errors
///
/// Returns an error if the email or password is invalid, the user exists,
/// or the database is unreachable.
pub async fn create(email: &str, password: &SecretString) -> Result<(), CommandError> {
    let email = parse_email(email)?;
    check_password(password)?;

    let pool = connect().await?;
    let identity = PgIdentityProvider::new(pool, UNUSED_TOKEN_TTL);

    tracing::info!("Creating user: {}", email);
    let uid = identity
        .create_user(&email, password.expose_secret())
        .await
        .map_err(|e| match e {
            AuthError::UserAlreadyExists => CommandError::UserExists(email.to_string()),
            other => CommandError::Identity(other),
        })?;

    tracing::info!("Created user {} with id {}", email, uid);
    Ok(())
}

/// Delete an identity user. Its credentials are removed with it.
///
/// # Errors
///
/// Returns an error if the email is invalid, no such user exists, or the
/// database is unreachable.
pub async fn delete(email: &str) -> Result<(), CommandError> {
    let email = parse_email(email)?;

    let pool = connect().await?;
    let identity = PgIdentityProvider::new(pool, UNUSED_TOKEN_TTL);

    if !identity.delete_user(&email).await? {
        return Err(CommandError::UserNotFound(email.to_string()));
    }

    tracing::info!("Deleted user {}", email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_email_trims() {
        assert_eq!(
            parse_email("  admin@example.com ").map(|e| e.to_string()).ok(),
            Some("admin@example.com".to_owned())
        );
        assert!(matches!(
            parse_email("not-an-email"),
            Err(CommandError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            check_password(&SecretString::from("short")),
            Err(CommandError::WeakPassword(MIN_PASSWORD_LENGTH))
        ));
        assert!(check_password(&SecretString::from("long enough password")).is_ok());
    }
}
