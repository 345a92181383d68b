//! Client-side view of the identity provider.
//!
//! An [`AuthClient`] is built per browser session from the shared
//! [`IdentityProvider`] and the browser's [`KeyValueStore`]. It keeps the
//! provider credential in storage and publishes the signed-in user on a
//! `watch` channel; [`SessionSubscription`]s read from that channel.

pub mod gate;

use std::sync::Arc;

use tokio::sync::watch;

use linkbio_core::Email;

use crate::backend::{AuthError, AuthUser, IdToken, IdentityProvider};
use crate::storage::KeyValueStore;

pub use gate::{AuthGate, GateState, GateView};

/// Key under which the provider credential is stored.
pub const TOKEN_KEY: &str = "linkbio.auth.token";

/// What the client knows about the current user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Not determined yet.
    Pending,
    SignedIn(AuthUser),
    SignedOut,
}

/// A session change delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Present(AuthUser),
    Absent,
}

/// Identity client for one browser session.
pub struct AuthClient {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn KeyValueStore>,
    state: watch::Sender<AuthState>,
}

impl AuthClient {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, store: Arc<dyn KeyValueStore>) -> Self {
        let (state, _) = watch::channel(AuthState::Pending);
        Self {
            provider,
            store,
            state,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.state.receiver_count()
    }

    /// Re-establish the session from the stored credential.
    ///
    /// Publishes the user if the credential is still valid, otherwise drops
    /// the credential and publishes absence. A provider or storage failure
    /// is logged and treated as absence.
    pub async fn restore(&self) -> AuthState {
        let token = match self.store.get_item(TOKEN_KEY).await {
            Ok(Some(token)) => IdToken::new(token),
            Ok(None) => return self.publish(AuthState::SignedOut),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored credential");
                return self.publish(AuthState::SignedOut);
            }
        };

        match self.provider.verify(&token).await {
            Ok(Some(user)) => self.publish(AuthState::SignedIn(user)),
            Ok(None) => {
                tracing::debug!("Stored credential is no longer valid");
                self.forget_token().await;
                self.publish(AuthState::SignedOut)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to verify stored credential");
                self.publish(AuthState::SignedOut)
            }
        }
    }

    /// Sign in and persist the credential.
    ///
    /// # Errors
    ///
    /// Returns the provider's error, or `AuthError::Unavailable` if the
    /// credential could not be stored.
    pub async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<AuthUser, AuthError> {
        let credential = self.provider.sign_in_with_password(email, password).await?;

        if let Err(e) = self
            .store
            .set_item(TOKEN_KEY, credential.token.expose().to_owned())
            .await
        {
            if let Err(revoke_error) = self.provider.revoke(&credential.token).await {
                tracing::warn!(error = %revoke_error, "Failed to revoke unsaved credential");
            }
            return Err(AuthError::Unavailable(e.to_string()));
        }

        self.publish(AuthState::SignedIn(credential.user.clone()));
        Ok(credential.user)
    }

    /// Sign out: revoke the credential, forget it and publish absence.
    ///
    /// Always succeeds locally; provider failures are logged.
    pub async fn sign_out(&self) {
        match self.store.get_item(TOKEN_KEY).await {
            Ok(Some(token)) => {
                if let Err(e) = self.provider.revoke(&IdToken::new(token)).await {
                    tracing::warn!(error = %e, "Failed to revoke credential");
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to read stored credential"),
        }

        self.forget_token().await;
        self.publish(AuthState::SignedOut);
    }

    /// Follow session changes. The current state is delivered first, once
    /// known.
    #[must_use]
    pub fn on_session_change(&self) -> SessionSubscription {
        SessionSubscription {
            rx: Some(self.state.subscribe()),
            primed: false,
        }
    }

    async fn forget_token(&self) {
        if let Err(e) = self.store.remove_item(TOKEN_KEY).await {
            tracing::warn!(error = %e, "Failed to remove stored credential");
        }
    }

    fn publish(&self, next: AuthState) -> AuthState {
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next.clone();
                true
            }
        });
        next
    }
}

/// A subscription to session changes.
///
/// [`unsubscribe`](Self::unsubscribe) detaches it; it runs at most once
/// and is also called on drop.
#[derive(Debug)]
pub struct SessionSubscription {
    rx: Option<watch::Receiver<AuthState>>,
    primed: bool,
}

impl SessionSubscription {
    /// Wait for the next event. `None` once unsubscribed or the client is
    /// gone.
    pub async fn next(&mut self) -> Option<SessionEvent> {
        let rx = self.rx.as_mut()?;
        if self.primed {
            rx.changed().await.ok()?;
        }
        self.primed = true;

        loop {
            let event = match &*rx.borrow_and_update() {
                AuthState::Pending => None,
                AuthState::SignedIn(user) => Some(SessionEvent::Present(user.clone())),
                AuthState::SignedOut => Some(SessionEvent::Absent),
            };
            if event.is_some() {
                return event;
            }
            rx.changed().await.ok()?;
        }
    }

    /// Stop receiving events.
    pub fn unsubscribe(&mut self) {
        self.rx = None;
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.rx.is_some()
    }
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::backend::memory::MemoryIdentityProvider;
    use crate::storage::MemoryKeyValueStore;

    pub const ADMIN_EMAIL: &str = "admin@example.com";
    pub const ADMIN_PASSWORD: &str = "correct-horse-battery";

    pub async fn provider() -> Arc<MemoryIdentityProvider> {
        let provider = MemoryIdentityProvider::new(TimeDelta::hours(1));
        provider
            .add_user(&Email::parse(ADMIN_EMAIL).unwrap(), ADMIN_PASSWORD)
            .await
            .unwrap();
        Arc::new(provider)
    }

    #[tokio::test]
    async fn test_restore_without_credential_is_signed_out() {
        let client = AuthClient::new(provider().await, Arc::new(MemoryKeyValueStore::new()));
        assert_eq!(client.state(), AuthState::Pending);
        assert_eq!(client.restore().await, AuthState::SignedOut);
    }

    #[tokio::test]
    async fn test_sign_in_persists_credential_for_restore() {
        let provider = provider().await;
        let store = Arc::new(MemoryKeyValueStore::new());
        let email = Email::parse(ADMIN_EMAIL).unwrap();

        let first = AuthClient::new(provider.clone(), store.clone());
        let user = first
            .sign_in_with_password(&email, ADMIN_PASSWORD)
            .await
            .unwrap();
        assert!(store.get_item(TOKEN_KEY).await.unwrap().is_some());

        let second = AuthClient::new(provider, store);
        assert_eq!(second.restore().await, AuthState::SignedIn(user));
    }

    #[tokio::test]
    async fn test_sign_out_revokes_and_forgets() {
        let provider = provider().await;
        let store = Arc::new(MemoryKeyValueStore::new());
        let client = AuthClient::new(provider.clone(), store.clone());
        client
            .sign_in_with_password(&Email::parse(ADMIN_EMAIL).unwrap(), ADMIN_PASSWORD)
            .await
            .unwrap();
        let token = IdToken::new(store.get_item(TOKEN_KEY).await.unwrap().unwrap());

        client.sign_out().await;

        assert_eq!(client.state(), AuthState::SignedOut);
        assert!(store.get_item(TOKEN_KEY).await.unwrap().is_none());
        assert!(provider.verify(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bad_password_leaves_state_alone() {
        let client = AuthClient::new(provider().await, Arc::new(MemoryKeyValueStore::new()));
        let result = client
            .sign_in_with_password(&Email::parse(ADMIN_EMAIL).unwrap(), "nope")
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        assert_eq!(client.state(), AuthState::Pending);
    }

    #[tokio::test]
    async fn test_subscription_yields_current_then_changes() {
        let client = AuthClient::new(provider().await, Arc::new(MemoryKeyValueStore::new()));
        let mut subscription = client.on_session_change();

        client.restore().await;
        assert_eq!(subscription.next().await, Some(SessionEvent::Absent));

        let user = client
            .sign_in_with_password(&Email::parse(ADMIN_EMAIL).unwrap(), ADMIN_PASSWORD)
            .await
            .unwrap();
        assert_eq!(subscription.next().await, Some(SessionEvent::Present(user)));

        client.sign_out().await;
        assert_eq!(subscription.next().await, Some(SessionEvent::Absent));
    }

    #[tokio::test]
    async fn test_unsubscribe_runs_once() {
        let client = AuthClient::new(provider().await, Arc::new(MemoryKeyValueStore::new()));
        let mut subscription = client.on_session_change();
        assert_eq!(client.listener_count(), 1);

        subscription.unsubscribe();
        subscription.unsubscribe();
        assert_eq!(client.listener_count(), 0);
        assert!(!subscription.is_active());
        assert_eq!(subscription.next().await, None);

        drop(subscription);
        assert_eq!(client.listener_count(), 0);
    }
}
