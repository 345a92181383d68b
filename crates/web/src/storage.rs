//! Per-browser key-value storage.
//!
//! The browser's `tower_sessions::Session` is the persistent key-value
//! store the application writes to. [`SessionCache`] mirrors the signed-in
//! user into it as JSON text.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tower_sessions::Session;

use linkbio_core::UserSession;

/// Key under which the signed-in user is mirrored.
pub const SESSION_KEY: &str = "linkbio.session";

/// Errors from a [`KeyValueStore`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// The browser session could not be read or written.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// A value could not be serialized.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A string-keyed, string-valued store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Write a value, replacing any previous one.
    async fn set_item(&self, key: &str, value: String) -> Result<(), StorageError>;

    /// Read a value.
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Remove a value. Removing a missing key is not an error.
    async fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

#[async_trait]
impl KeyValueStore for Session {
    async fn set_item(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.insert(key, value).await?;
        Ok(())
    }

    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get::<String>(key).await?)
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.remove_value(key).await?;
        Ok(())
    }
}

/// A [`KeyValueStore`] held in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryKeyValueStore {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn set_item(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.items.lock().await.insert(key.to_owned(), value);
        Ok(())
    }

    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.lock().await.get(key).cloned())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.lock().await.remove(key);
        Ok(())
    }
}

/// The signed-in user, mirrored into a [`KeyValueStore`].
#[derive(Clone)]
pub struct SessionCache {
    store: Arc<dyn KeyValueStore>,
}

impl SessionCache {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Cache backed by a browser session.
    #[must_use]
    pub fn for_session(session: &Session) -> Self {
        Self::new(Arc::new(session.clone()))
    }

    /// Store the session, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn save(&self, session: &UserSession) -> Result<(), StorageError> {
        let text = serde_json::to_string(session)?;
        self.store.set_item(SESSION_KEY, text).await
    }

    /// The stored session, if any.
    ///
    /// A missing key, a storage failure and unparseable text all read as
    /// `None`.
    pub async fn load(&self) -> Option<UserSession> {
        let text = match self.store.get_item(SESSION_KEY).await {
            Ok(text) => text?,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cached session");
                return None;
            }
        };

        serde_json::from_str(&text)
            .inspect_err(|e| tracing::debug!(error = %e, "Ignoring unparseable cached session"))
            .ok()
    }

    /// Remove the stored session. No-op when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal fails.
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.store.remove_item(SESSION_KEY).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use linkbio_core::{Email, UserId};

    use super::*;

    fn session() -> UserSession {
        UserSession {
            uid: UserId::new("u1"),
            email: Email::parse("a@b.com").ok(),
        }
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let cache = SessionCache::new(Arc::new(MemoryKeyValueStore::new()));
        cache.save(&session()).await.unwrap();
        assert_eq!(cache.load().await, Some(session()));
    }

    #[tokio::test]
    async fn test_save_replaces_previous_value() {
        let cache = SessionCache::new(Arc::new(MemoryKeyValueStore::new()));
        cache.save(&session()).await.unwrap();
        let other = UserSession {
            uid: UserId::new("u2"),
            email: None,
        };
        cache.save(&other).await.unwrap();
        assert_eq!(cache.load().await, Some(other));
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let cache = SessionCache::new(Arc::new(MemoryKeyValueStore::new()));
        assert_eq!(cache.load().await, None);
    }

    #[tokio::test]
    async fn test_load_garbage_is_none() {
        let store = Arc::new(MemoryKeyValueStore::new());
        store
            .set_item(SESSION_KEY, "{not json".to_owned())
            .await
            .unwrap();
        let cache = SessionCache::new(store);
        assert_eq!(cache.load().await, None);
    }

    #[tokio::test]
    async fn test_clear_is_noop_when_absent() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let cache = SessionCache::new(store.clone());
        cache.clear().await.unwrap();

        cache.save(&session()).await.unwrap();
        cache.clear().await.unwrap();
        assert_eq!(store.get_item(SESSION_KEY).await.unwrap(), None);
    }
}
