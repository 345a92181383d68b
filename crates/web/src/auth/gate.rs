//! Auth gate for admin-only views.
//!
//! The gate starts in [`GateState::Checking`] and settles on every session
//! event from the provider. While checking it renders a loading indicator
//! and never redirects, so protected content is never shown before the
//! provider has answered.

use tokio::sync::watch;

use linkbio_core::UserSession;

use super::{SessionEvent, SessionSubscription};
use crate::backend::AuthUser;
use crate::navigation::Navigation;
use crate::storage::SessionCache;

/// Where unauthenticated visitors are sent.
pub const LOGIN_PATH: &str = "/login";

/// Gate state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Checking,
    Authenticated(UserSession),
    Unauthenticated,
}

/// What the gate renders for its current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateView {
    Loading,
    Redirect(Navigation),
    Protected(UserSession),
}

impl From<&GateState> for GateView {
    fn from(state: &GateState) -> Self {
        match state {
            GateState::Checking => Self::Loading,
            GateState::Unauthenticated => Self::Redirect(Navigation::replace(LOGIN_PATH)),
            GateState::Authenticated(session) => Self::Protected(session.clone()),
        }
    }
}

/// Guards a protected view.
///
/// Dropping the gate drops its subscription, which unsubscribes.
pub struct AuthGate {
    subscription: SessionSubscription,
    cache: SessionCache,
    state: watch::Sender<GateState>,
}

impl AuthGate {
    #[must_use]
    pub fn new(subscription: SessionSubscription, cache: SessionCache) -> Self {
        let (state, _) = watch::channel(GateState::Checking);
        Self {
            subscription,
            cache,
            state,
        }
    }

    #[must_use]
    pub fn state(&self) -> GateState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn view(&self) -> GateView {
        GateView::from(&*self.state.borrow())
    }

    /// Observe state changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<GateState> {
        self.state.subscribe()
    }

    /// Apply one session event.
    pub async fn handle(&self, event: SessionEvent) {
        let next = match event {
            SessionEvent::Present(AuthUser { uid, email }) => {
                let session = UserSession { uid, email };
                if let Err(e) = self.cache.save(&session).await {
                    tracing::warn!(error = %e, "Failed to cache session");
                }
                GateState::Authenticated(session)
            }
            SessionEvent::Absent => GateState::Unauthenticated,
        };
        self.state.send_replace(next);
    }

    /// Wait for the next session event and apply it. `None` once the
    /// subscription has ended.
    pub async fn next_state(&mut self) -> Option<GateState> {
        let event = self.subscription.next().await?;
        self.handle(event).await;
        Some(self.state())
    }

    /// Wait until the gate has left [`GateState::Checking`].
    ///
    /// If the subscription ends first the gate stays in `Checking`.
    pub async fn settled(&mut self) -> GateState {
        while self.state() == GateState::Checking {
            if self.next_state().await.is_none() {
                break;
            }
        }
        self.state()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use linkbio_core::Email;

    use super::*;
    use crate::auth::AuthClient;
    use crate::auth::tests::{ADMIN_EMAIL, ADMIN_PASSWORD, provider};
    use crate::storage::{KeyValueStore, MemoryKeyValueStore, SESSION_KEY};

    async fn setup() -> (AuthClient, AuthGate, Arc<MemoryKeyValueStore>) {
        let store = Arc::new(MemoryKeyValueStore::new());
        let client = AuthClient::new(provider().await, store.clone());
        let gate = AuthGate::new(client.on_session_change(), SessionCache::new(store.clone()));
        (client, gate, store)
    }

    #[tokio::test]
    async fn test_checking_shows_loading_not_redirect() {
        let (_client, gate, _store) = setup().await;
        assert_eq!(gate.state(), GateState::Checking);
        assert_eq!(gate.view(), GateView::Loading);
    }

    #[tokio::test]
    async fn test_absent_user_redirects_to_login() {
        let (client, mut gate, store) = setup().await;
        let (_, state) = tokio::join!(client.restore(), gate.settled());

        assert_eq!(state, GateState::Unauthenticated);
        assert_eq!(
            gate.view(),
            GateView::Redirect(Navigation::replace("/login"))
        );
        assert!(store.get_item(SESSION_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_present_user_is_cached_and_protected() {
        let (client, mut gate, store) = setup().await;
        client
            .sign_in_with_password(&Email::parse(ADMIN_EMAIL).unwrap(), ADMIN_PASSWORD)
            .await
            .unwrap();

        let state = gate.settled().await;
        let GateState::Authenticated(session) = state else {
            panic!("expected authenticated, got {state:?}");
        };
        assert_eq!(session.email.unwrap().as_str(), ADMIN_EMAIL);
        assert!(matches!(gate.view(), GateView::Protected(_)));
        assert!(store.get_item(SESSION_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_follows_sign_out_without_clearing_cache() {
        let (client, mut gate, store) = setup().await;
        client
            .sign_in_with_password(&Email::parse(ADMIN_EMAIL).unwrap(), ADMIN_PASSWORD)
            .await
            .unwrap();
        gate.settled().await;

        client.sign_out().await;
        assert_eq!(gate.next_state().await, Some(GateState::Unauthenticated));
        assert!(store.get_item(SESSION_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let (client, gate, _store) = setup().await;
        assert_eq!(client.listener_count(), 1);
        drop(gate);
        assert_eq!(client.listener_count(), 0);
    }
}
