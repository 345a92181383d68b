//! Application state shared across handlers.

use std::sync::Arc;

use tower_sessions::Session;

use crate::auth::AuthClient;
use crate::backend::{DocumentStore, IdentityProvider};
use crate::config::LinkbioConfig;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and holds the explicitly
/// constructed backends.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: LinkbioConfig,
    identity: Arc<dyn IdentityProvider>,
    documents: Arc<dyn DocumentStore>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        config: LinkbioConfig,
        identity: Arc<dyn IdentityProvider>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                identity,
                documents,
            }),
        }
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &LinkbioConfig {
        &self.inner.config
    }

    /// Get a handle to the identity provider.
    #[must_use]
    pub fn identity(&self) -> Arc<dyn IdentityProvider> {
        Arc::clone(&self.inner.identity)
    }

    /// Get a handle to the document store.
    #[must_use]
    pub fn documents(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.inner.documents)
    }

    /// Borrow the document store.
    #[must_use]
    pub fn store(&self) -> &dyn DocumentStore {
        self.inner.documents.as_ref()
    }

    /// Build the identity client for one browser session.
    #[must_use]
    pub fn auth_client(&self, session: &Session) -> AuthClient {
        AuthClient::new(self.identity(), Arc::new(session.clone()))
    }
}
