//! Login form.

use std::sync::Arc;

use linkbio_core::validation::{is_valid_email, require};
use linkbio_core::{Email, ErrorMessage, SuccessMessage, ValidationError};

use super::{FormCell, Submission};
use crate::auth::AuthClient;
use crate::navigation::Navigation;

/// Where a successful login goes.
pub const AFTER_LOGIN: Navigation = Navigation::replace("/admin");

/// Login form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginFields {
    pub email: String,
    pub password: String,
}

/// Email/password sign-in.
pub struct LoginForm {
    cell: FormCell<LoginFields>,
    client: Arc<AuthClient>,
}

impl LoginForm {
    #[must_use]
    pub fn new(client: Arc<AuthClient>) -> Self {
        Self {
            cell: FormCell::new(LoginFields::default()),
            client,
        }
    }

    #[must_use]
    pub const fn cell(&self) -> &FormCell<LoginFields> {
        &self.cell
    }

    /// Validate and sign in. On [`Submission::Done`] the caller navigates
    /// to [`AFTER_LOGIN`].
    pub async fn submit(&self) -> Submission {
        let Ok(fields) = self.cell.begin() else {
            return Submission::Busy;
        };

        let email = match validate(&fields) {
            Ok(email) => email,
            Err(e) => {
                self.cell.fail(e.to_string());
                return Submission::Invalid;
            }
        };

        self.cell.start_write();
        match self
            .client
            .sign_in_with_password(&email, &fields.password)
            .await
        {
            Ok(user) => {
                tracing::info!(user_id = %user.uid, "User signed in");
                self.cell
                    .succeed(SuccessMessage::LoggedIn, |f| f.password.clear());
                Submission::Done
            }
            Err(e) => {
                tracing::warn!(error = %e, email = %email, "Sign-in failed");
                self.cell.fail(ErrorMessage::LoginFailed.as_str());
                Submission::Failed
            }
        }
    }
}

fn validate(fields: &LoginFields) -> Result<Email, ValidationError> {
    require(&[
        ("email", fields.email.as_str()),
        ("password", fields.password.as_str()),
    ])?;

    // Shape is checked on the raw input; only the provider sees it trimmed.
    if !is_valid_email(&fields.email) {
        return Err(ValidationError::InvalidEmail);
    }
    Email::parse(fields.email.trim()).map_err(|_| ValidationError::InvalidEmail)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::tests::{ADMIN_EMAIL, ADMIN_PASSWORD, provider};
    use crate::auth::{AuthState, SessionEvent};
    use crate::forms::FormStatus;
    use crate::storage::MemoryKeyValueStore;

    async fn form() -> (LoginForm, Arc<AuthClient>) {
        let client = Arc::new(AuthClient::new(
            provider().await,
            Arc::new(MemoryKeyValueStore::new()),
        ));
        (LoginForm::new(client.clone()), client)
    }

    fn fill(form: &LoginForm, email: &str, password: &str) {
        form.cell()
            .edit(|f| {
                f.email = email.to_owned();
                f.password = password.to_owned();
            })
            .unwrap();
    }

    #[tokio::test]
    async fn test_required_fields_checked_first() {
        let (form, client) = form().await;
        fill(&form, "not-an-email", "  ");

        assert_eq!(form.submit().await, Submission::Invalid);
        assert_eq!(
            form.cell().status(),
            FormStatus::Failed("Fill in all required fields!".to_owned())
        );
        assert_eq!(client.state(), AuthState::Pending);
    }

    #[tokio::test]
    async fn test_bad_email_shape() {
        let (form, _client) = form().await;
        fill(&form, "a@b", "password");

        assert_eq!(form.submit().await, Submission::Invalid);
        assert_eq!(
            form.cell().status(),
            FormStatus::Failed("Please enter a valid email.".to_owned())
        );
    }

    #[tokio::test]
    async fn test_wrong_password_shows_generic_message() {
        let (form, _client) = form().await;
        fill(&form, ADMIN_EMAIL, "wrong-password");

        assert_eq!(form.submit().await, Submission::Failed);
        assert_eq!(
            form.cell().status(),
            FormStatus::Failed("Login failed. Check your credentials.".to_owned())
        );
    }

    #[tokio::test]
    async fn test_padded_email_is_invalid() {
        let (form, client) = form().await;
        fill(&form, &format!("  {ADMIN_EMAIL} "), ADMIN_PASSWORD);

        assert_eq!(form.submit().await, Submission::Invalid);
        assert_eq!(
            form.cell().status(),
            FormStatus::Failed("Please enter a valid email.".to_owned())
        );
        assert_eq!(client.state(), AuthState::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_signs_in() {
        let (form, client) = form().await;
        let mut subscription = client.on_session_change();
        fill(&form, ADMIN_EMAIL, ADMIN_PASSWORD);

        assert_eq!(form.submit().await, Submission::Done);
        assert!(form.cell().status().is_success());
        assert!(form.cell().fields().password.is_empty());
        assert!(matches!(
            subscription.next().await,
            Some(SessionEvent::Present(_))
        ));
        assert_eq!(AFTER_LOGIN, Navigation::replace("/admin"));
    }
}
