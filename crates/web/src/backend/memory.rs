//! In-process backends.
//!
//! Used by the test suites and by `LINKBIO_BACKEND=memory` for local
//! development. State lives for the lifetime of the process.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::{Mutex, RwLock, broadcast};
use uuid::Uuid;

use linkbio_core::{Email, UserId};

use super::password::{hash_password, verify_password};
use super::{
    AuthError, AuthUser, CHANGE_CHANNEL_CAPACITY, Change, Credential, Direction, Document,
    DocumentStore, Fields, IdToken, IdentityProvider, LiveQuery, StoreError, spawn_live_query,
    token,
};

// =============================================================================
// Document store
// =============================================================================

/// A document store held in memory.
///
/// Cloning is cheap and every clone sees the same data.
#[derive(Clone)]
pub struct MemoryDocumentStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    collections: RwLock<HashMap<String, HashMap<String, Document>>>,
    last_created_at: Mutex<DateTime<Utc>>,
    changes: broadcast::Sender<Change>,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(StoreInner {
                collections: RwLock::new(HashMap::new()),
                last_created_at: Mutex::new(DateTime::<Utc>::MIN_UTC),
                changes,
            }),
        }
    }

    /// Creation timestamps are strictly increasing so that ordering by
    /// them is total even for writes within the same clock tick.
    async fn next_created_at(&self) -> DateTime<Utc> {
        let mut last = self.inner.last_created_at.lock().await;
        let now = Utc::now();
        let next = if now > *last {
            now
        } else {
            *last + TimeDelta::microseconds(1)
        };
        *last = next;
        next
    }

    fn notify(&self, collection: &str) {
        // No receivers is fine: nobody is watching.
        let _ = self
            .inner
            .changes
            .send(Change::Collection(collection.to_owned()));
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_documents(documents: &mut [Document], direction: Direction) {
    documents.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    if direction == Direction::Descending {
        documents.reverse();
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        let created_at = self.next_created_at().await;

        self.inner
            .collections
            .write()
            .await
            .entry(collection.to_owned())
            .or_default()
            .insert(
                id.clone(),
                Document {
                    id: id.clone(),
                    created_at,
                    fields,
                },
            );

        self.notify(collection);
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self
            .inner
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn query(
        &self,
        collection: &str,
        direction: Direction,
    ) -> Result<Vec<Document>, StoreError> {
        let mut documents: Vec<Document> = self
            .inner
            .collections
            .read()
            .await
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default();
        sort_documents(&mut documents, direction);
        Ok(documents)
    }

    async fn subscribe(
        &self,
        collection: &str,
        direction: Direction,
    ) -> Result<LiveQuery, StoreError> {
        let changes = self.inner.changes.subscribe();
        let store = self.clone();
        let target = collection.to_owned();

        Ok(spawn_live_query(changes, collection.to_owned(), move || {
            let store = store.clone();
            let target = target.clone();
            async move { store.query(&target, direction).await }
        }))
    }

    async fn merge(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let mut collections = self.inner.collections.write().await;
        let docs = collections.entry(collection.to_owned()).or_default();

        if let Some(existing) = docs.get_mut(id) {
            existing.fields.extend(fields);
        } else {
            let created_at = self.next_created_at().await;
            docs.insert(
                id.to_owned(),
                Document {
                    id: id.to_owned(),
                    created_at,
                    fields,
                },
            );
        }
        drop(collections);

        self.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let removed = self
            .inner
            .collections
            .write()
            .await
            .get_mut(collection)
            .and_then(|docs| docs.remove(id));

        if removed.is_some() {
            self.notify(collection);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// =============================================================================
// Identity provider
// =============================================================================

struct MemoryUser {
    uid: UserId,
    email: Email,
    password_hash: String,
}

struct IssuedToken {
    user: AuthUser,
    expires_at: DateTime<Utc>,
}

/// An identity provider holding users and tokens in memory.
pub struct MemoryIdentityProvider {
    /// Keyed by lowercased email.
    users: RwLock<HashMap<String, MemoryUser>>,
    /// Keyed by token digest.
    tokens: RwLock<HashMap<String, IssuedToken>>,
    token_ttl: TimeDelta,
}

impl MemoryIdentityProvider {
    #[must_use]
    pub fn new(token_ttl: TimeDelta) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
            token_ttl,
        }
    }

    /// Register a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserAlreadyExists` if the email is taken, or
    /// `AuthError::PasswordHash` if hashing fails.
    pub async fn add_user(&self, email: &Email, password: &str) -> Result<UserId, AuthError> {
        let key = email.as_str().to_lowercase();
        let mut users = self.users.write().await;
        if users.contains_key(&key) {
            return Err(AuthError::UserAlreadyExists);
        }

        let uid = UserId::new(Uuid::new_v4().to_string());
        users.insert(
            key,
            MemoryUser {
                uid: uid.clone(),
                email: email.clone(),
                password_hash: hash_password(password)?,
            },
        );
        Ok(uid)
    }

    #[cfg(test)]
    async fn token_count(&self) -> usize {
        self.tokens.read().await.len()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<Credential, AuthError> {
        let user = {
            let users = self.users.read().await;
            let found = users
                .get(&email.as_str().to_lowercase())
                .ok_or(AuthError::InvalidCredentials)?;
            verify_password(password, &found.password_hash)?;
            AuthUser {
                uid: found.uid.clone(),
                email: Some(found.email.clone()),
            }
        };

        let token = token::generate();
        let now = Utc::now();
        let mut tokens = self.tokens.write().await;
        tokens.retain(|_, issued| issued.expires_at > now);
        tokens.insert(
            token::digest(&token),
            IssuedToken {
                user: user.clone(),
                expires_at: now + self.token_ttl,
            },
        );
        drop(tokens);

        Ok(Credential { user, token })
    }

    async fn verify(&self, token: &IdToken) -> Result<Option<AuthUser>, AuthError> {
        Ok(self
            .tokens
            .read()
            .await
            .get(&token::digest(token))
            .filter(|issued| issued.expires_at > Utc::now())
            .map(|issued| issued.user.clone()))
    }

    async fn revoke(&self, token: &IdToken) -> Result<(), AuthError> {
        self.tokens.write().await.remove(&token::digest(token));
        Ok(())
    }
}
