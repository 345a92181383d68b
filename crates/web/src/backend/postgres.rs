//! `PostgreSQL` backends.
//!
//! Documents are rows in a single `documents` table with a JSONB `fields`
//! column. A trigger publishes the collection name on the
//! `linkbio_documents` channel after every write. One listener connection
//! per store follows that channel and fans the notices out to every live
//! query. Identity users and their bearer tokens live in
//! `identity_user` and `identity_token`; only token digests are stored.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use sqlx::types::Json;
use tokio::sync::{OnceCell, broadcast};
use tracing::instrument;
use uuid::Uuid;

use linkbio_core::{Email, UserId};

use super::password::{hash_password, verify_password};
use super::{
    AuthError, AuthUser, CHANGE_CHANNEL_CAPACITY, Change, Credential, Direction, Document,
    DocumentStore, Fields, IdToken, IdentityProvider, LiveQuery, StoreError, spawn_live_query,
    token,
};

/// Notification channel written by the `documents` trigger.
pub const CHANGE_CHANNEL: &str = "linkbio_documents";

/// Pause before listening again after the listener connection failed.
const LISTENER_RETRY_DELAY: Duration = Duration::from_secs(1);

// =============================================================================
// Document store
// =============================================================================

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    created_at: DateTime<Utc>,
    fields: Json<Fields>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: row.id,
            created_at: row.created_at,
            fields: row.fields.0,
        }
    }
}

/// Document store backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    /// Started by the first live query and shared by all of them.
    changes: Arc<OnceCell<broadcast::Sender<Change>>>,
}

impl PgDocumentStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            changes: Arc::new(OnceCell::new()),
        }
    }

    /// The shared change channel, starting its listener on first use.
    async fn changes(&self) -> Result<&broadcast::Sender<Change>, StoreError> {
        self.changes
            .get_or_try_init(|| async {
                let mut listener = PgListener::connect_with(&self.pool).await?;
                listener.listen(CHANGE_CHANNEL).await?;

                let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
                tokio::spawn(forward_changes(listener, changes.clone()));
                tracing::info!(channel = CHANGE_CHANNEL, "Document change listener started");
                Ok::<_, StoreError>(changes)
            })
            .await
    }

    async fn fetch_all(
        pool: &PgPool,
        collection: &str,
        direction: Direction,
    ) -> Result<Vec<Document>, StoreError> {
        let sql = match direction {
            Direction::Ascending => {
                "SELECT id, created_at, fields FROM documents \
                 WHERE collection = $1 ORDER BY created_at ASC, id ASC"
            }
            Direction::Descending => {
                "SELECT id, created_at, fields FROM documents \
                 WHERE collection = $1 ORDER BY created_at DESC, id DESC"
            }
        };

        let rows = sqlx::query_as::<_, DocumentRow>(sql)
            .bind(collection)
            .fetch_all(pool)
            .await?;

        Ok(rows.into_iter().map(Document::from).collect())
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    #[instrument(skip(self, fields))]
    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let id = Uuid::new_v4().simple().to_string();

        sqlx::query("INSERT INTO documents (collection, id, fields) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(&id)
            .bind(Json(&fields))
            .execute(&self.pool)
            .await?;

        Ok(id)
    }

    #[instrument(skip(self))]
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, created_at, fields FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Document::from))
    }

    #[instrument(skip(self))]
    async fn query(
        &self,
        collection: &str,
        direction: Direction,
    ) -> Result<Vec<Document>, StoreError> {
        Self::fetch_all(&self.pool, collection, direction).await
    }

    #[instrument(skip(self))]
    async fn subscribe(
        &self,
        collection: &str,
        direction: Direction,
    ) -> Result<LiveQuery, StoreError> {
        let changes = self.changes().await?.subscribe();
        let pool = self.pool.clone();
        let target = collection.to_owned();

        Ok(spawn_live_query(changes, collection.to_owned(), move || {
            let pool = pool.clone();
            let target = target.clone();
            async move { Self::fetch_all(&pool, &target, direction).await }
        }))
    }

    #[instrument(skip(self, fields))]
    async fn merge(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO documents (collection, id, fields)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id)
            DO UPDATE SET fields = documents.fields || EXCLUDED.fields
            ",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(&fields))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Forward notifications from the listener connection to the change
/// channel for as long as the process runs. `PgListener` reconnects on the
/// next `recv` after a failure.
async fn forward_changes(mut listener: PgListener, changes: broadcast::Sender<Change>) {
    loop {
        match listener.recv().await {
            Ok(notification) => {
                // No receivers is fine: nobody is watching.
                let _ = changes.send(Change::Collection(notification.payload().to_owned()));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Document change listener failed");
                let _ = changes.send(Change::Lost(e.to_string()));
                tokio::time::sleep(LISTENER_RETRY_DELAY).await;
            }
        }
    }
}

// =============================================================================
// Identity provider
// =============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
}

#[derive(sqlx::FromRow)]
struct TokenUserRow {
    id: Uuid,
    email: String,
}

fn auth_user(id: Uuid, email: &str) -> AuthUser {
    AuthUser {
        uid: UserId::new(id.to_string()),
        // Stored emails were validated on insert.
        email: Email::parse(email).ok(),
    }
}

/// Identity provider backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgIdentityProvider {
    pool: PgPool,
    token_ttl: TimeDelta,
}

impl PgIdentityProvider {
    #[must_use]
    pub const fn new(pool: PgPool, token_ttl: TimeDelta) -> Self {
        Self { pool, token_ttl }
    }

    /// Register a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserAlreadyExists` if the email is taken,
    /// `AuthError::PasswordHash` if hashing fails, or a database error.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn create_user(&self, email: &Email, password: &str) -> Result<UserId, AuthError> {
        let password_hash = hash_password(password)?;

        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO identity_user (email, password_hash) VALUES (lower($1), $2) RETURNING id",
        )
        .bind(email.as_str())
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error()
                .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
            {
                AuthError::UserAlreadyExists
            } else {
                AuthError::Database(e)
            }
        })?;

        Ok(UserId::new(id.to_string()))
    }

    /// Delete a user and every token issued to them.
    ///
    /// Returns `false` when no user has this email.
    ///
    /// # Errors
    ///
    /// Returns a database error if the delete fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn delete_user(&self, email: &Email) -> Result<bool, AuthError> {
        let result = sqlx::query("DELETE FROM identity_user WHERE email = lower($1)")
            .bind(email.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl IdentityProvider for PgIdentityProvider {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<Credential, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash FROM identity_user WHERE email = lower($1)",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &row.password_hash)?;

        let token = token::generate();
        sqlx::query(
            "INSERT INTO identity_token (token_digest, user_id, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(token::digest(&token))
        .bind(row.id)
        .bind(Utc::now() + self.token_ttl)
        .execute(&self.pool)
        .await?;

        Ok(Credential {
            user: auth_user(row.id, &row.email),
            token,
        })
    }

    async fn verify(&self, token: &IdToken) -> Result<Option<AuthUser>, AuthError> {
        let row = sqlx::query_as::<_, TokenUserRow>(
            r"
            SELECT u.id, u.email
            FROM identity_token t
            JOIN identity_user u ON u.id = t.user_id
            WHERE t.token_digest = $1 AND t.expires_at > now()
            ",
        )
        .bind(token::digest(token))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| auth_user(r.id, &r.email)))
    }

    async fn revoke(&self, token: &IdToken) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM identity_token WHERE token_digest = $1 OR expires_at <= now()")
            .bind(token::digest(token))
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
