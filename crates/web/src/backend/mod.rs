//! Seams to the external services the application delegates to.
//!
//! Two services sit behind traits here:
//!
//! - [`IdentityProvider`] - verifies email/password credentials and issues
//!   opaque bearer tokens that later resolve back to a user.
//! - [`DocumentStore`] - a collection-oriented document database with
//!   point reads, ordered queries, merge-upserts and live queries.
//!
//! Each has an in-process implementation ([`memory`]) used by tests and
//! local development, and a `PostgreSQL` implementation ([`postgres`]).
//! Handlers only ever see `Arc<dyn ...>` handles held by `AppState`.

pub mod memory;
pub mod password;
pub mod postgres;
pub mod token;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use linkbio_core::{Email, UserId};

/// Field map of a stored document.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// One result set pushed by a [`LiveQuery`].
pub type Snapshot = Result<Vec<Document>, StoreError>;

// =============================================================================
// Errors
// =============================================================================

/// Errors reported by an [`IdentityProvider`].
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account with this email already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password hashing failed.
    #[error("password hashing error")]
    PasswordHash,

    /// Backing database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The provider could not be reached.
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Errors reported by a [`DocumentStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backing database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored document could not be decoded.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The store could not be reached.
    #[error("document store unavailable: {0}")]
    Unavailable(String),
}

// =============================================================================
// Identity
// =============================================================================

/// A user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: UserId,
    pub email: Option<Email>,
}

/// Opaque bearer token issued on sign-in.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct IdToken(SecretString);

impl IdToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw token, for persisting in the client's storage.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for IdToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IdToken([REDACTED])")
    }
}

/// Result of a successful sign-in.
#[derive(Debug, Clone)]
pub struct Credential {
    pub user: AuthUser,
    pub token: IdToken,
}

/// An identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify an email/password pair and issue a token.
    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<Credential, AuthError>;

    /// Resolve a token to its user; `None` if the token is unknown, expired
    /// or revoked.
    async fn verify(&self, token: &IdToken) -> Result<Option<AuthUser>, AuthError>;

    /// Invalidate a token. Revoking an unknown token is not an error.
    async fn revoke(&self, token: &IdToken) -> Result<(), AuthError>;
}

// =============================================================================
// Documents
// =============================================================================

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Store-assigned id, unique within the collection.
    pub id: String,
    /// Store-assigned creation time.
    pub created_at: DateTime<Utc>,
    /// Document fields.
    pub fields: Fields,
}

/// Sort direction on document creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// A document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document and return its generated id.
    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    /// Read one document.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Read every document in a collection, ordered by creation time.
    async fn query(&self, collection: &str, direction: Direction)
    -> Result<Vec<Document>, StoreError>;

    /// Like [`query`](Self::query), but keeps pushing a fresh result set
    /// every time the collection changes. The first snapshot is delivered
    /// right away.
    async fn subscribe(&self, collection: &str, direction: Direction)
    -> Result<LiveQuery, StoreError>;

    /// Create the document if missing, otherwise overwrite only the given
    /// fields and keep the rest.
    async fn merge(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Delete a document. Deleting a missing document is not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Check the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}

// =============================================================================
// Live queries
// =============================================================================

/// Buffered snapshots per live query before the producer waits.
pub(crate) const LIVE_QUERY_BUFFER: usize = 16;

/// Capacity of the change channel a store shares between its live queries.
pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// A store-wide change notice, fanned out to every live query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// A document in this collection was written.
    Collection(String),
    /// The change feed was interrupted; notices may have been missed.
    Lost(String),
}

/// A running live query.
///
/// Snapshots (or errors on the error channel) arrive through
/// [`next`](Self::next). The producing task is stopped by
/// [`unsubscribe`](Self::unsubscribe), which also runs on drop; calling it
/// more than once has no further effect.
#[derive(Debug)]
pub struct LiveQuery {
    rx: mpsc::Receiver<Snapshot>,
    task: Option<JoinHandle<()>>,
}

impl LiveQuery {
    /// Wrap a snapshot receiver and the task feeding it.
    #[must_use]
    pub const fn new(rx: mpsc::Receiver<Snapshot>, task: JoinHandle<()>) -> Self {
        Self {
            rx,
            task: Some(task),
        }
    }

    /// Wait for the next snapshot. `None` once unsubscribed or the producer
    /// has stopped.
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.rx.recv().await
    }

    /// Stop receiving updates.
    pub fn unsubscribe(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            self.rx.close();
        }
    }

    /// True until [`unsubscribe`](Self::unsubscribe) has run.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for LiveQuery {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Run a live query over a store's shared change channel.
///
/// Pushes `fetch()` once, then again after every change to `collection`,
/// after a lagged receiver and after a lost feed (preceded by the error).
/// Subscribe to `changes` before calling so no change slips between.
pub(crate) fn spawn_live_query<F, Fut>(
    mut changes: broadcast::Receiver<Change>,
    collection: String,
    fetch: F,
) -> LiveQuery
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Snapshot> + Send,
{
    let (tx, rx) = mpsc::channel(LIVE_QUERY_BUFFER);

    let task = tokio::spawn(async move {
        if tx.send(fetch().await).await.is_err() {
            return;
        }
        loop {
            match changes.recv().await {
                Ok(Change::Collection(changed)) if changed != collection => continue,
                Ok(Change::Collection(_)) | Err(RecvError::Lagged(_)) => {}
                Ok(Change::Lost(message)) => {
                    tracing::warn!(error = %message, collection = %collection, "Live query feed lost");
                    if tx.send(Err(StoreError::Unavailable(message))).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            }
            if tx.send(fetch().await).await.is_err() {
                break;
            }
        }
    });

    LiveQuery::new(rx, task)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counting_query(
        changes: &broadcast::Sender<Change>,
        fetches: &Arc<AtomicUsize>,
    ) -> LiveQuery {
        let fetches = Arc::clone(fetches);
        spawn_live_query(changes.subscribe(), "links".to_owned(), move || {
            let fetches = Arc::clone(&fetches);
            async move {
                fetches.fetch_add(1, Ordering::SeqCst);
                Ok(Vec::new())
            }
        })
    }

    #[tokio::test]
    async fn test_one_change_channel_feeds_every_query() {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let fetches = Arc::new(AtomicUsize::new(0));
        let mut queries: Vec<_> = (0..20).map(|_| counting_query(&changes, &fetches)).collect();

        for query in &mut queries {
            assert!(query.next().await.unwrap().is_ok());
        }
        changes.send(Change::Collection("links".to_owned())).unwrap();
        for query in &mut queries {
            assert!(query.next().await.unwrap().is_ok());
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 40);
    }

    #[tokio::test]
    async fn test_other_collections_are_ignored() {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let fetches = Arc::new(AtomicUsize::new(0));
        let mut query = counting_query(&changes, &fetches);
        query.next().await.unwrap().unwrap();

        changes.send(Change::Collection("social".to_owned())).unwrap();
        changes.send(Change::Collection("links".to_owned())).unwrap();
        query.next().await.unwrap().unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_lost_feed_reports_then_requeries() {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let fetches = Arc::new(AtomicUsize::new(0));
        let mut query = counting_query(&changes, &fetches);
        query.next().await.unwrap().unwrap();

        changes.send(Change::Lost("connection reset".to_owned())).unwrap();
        assert!(matches!(
            query.next().await.unwrap(),
            Err(StoreError::Unavailable(message)) if message == "connection reset"
        ));
        assert!(query.next().await.unwrap().is_ok());
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_closed_channel_ends_query() {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let fetches = Arc::new(AtomicUsize::new(0));
        let mut query = counting_query(&changes, &fetches);
        query.next().await.unwrap().unwrap();

        drop(changes);
        assert!(query.next().await.is_none());
    }
}
