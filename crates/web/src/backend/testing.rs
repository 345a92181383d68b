//! Test doubles for the backend traits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::memory::MemoryDocumentStore;
use super::{Direction, Document, DocumentStore, Fields, LiveQuery, StoreError};

/// Wraps a [`MemoryDocumentStore`], counts writes and can be told to fail.
///
/// Queries and point reads can each be held until a [`Notify`] fires.
#[derive(Clone, Default)]
pub struct RecordingStore {
    pub inner: MemoryDocumentStore,
    writes: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
    query_gate: Option<Arc<Notify>>,
    get_gate: Option<Arc<Notify>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every `query` until `gate` is notified.
    #[must_use]
    pub fn with_query_gate(mut self, gate: Arc<Notify>) -> Self {
        self.query_gate = Some(gate);
        self
    }

    /// Hold every `get` until `gate` is notified.
    #[must_use]
    pub fn with_get_gate(mut self, gate: Arc<Notify>) -> Self {
        self.get_gate = Some(gate);
        self
    }

    /// Number of create/merge/delete calls seen, failed ones included.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail.
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("injected failure".to_owned()))
        } else {
            Ok(())
        }
    }

    fn record_write(&self) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check()
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        self.record_write()?;
        self.inner.create(collection, fields).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        if let Some(gate) = &self.get_gate {
            gate.notified().await;
        }
        self.check()?;
        self.inner.get(collection, id).await
    }

    async fn query(
        &self,
        collection: &str,
        direction: Direction,
    ) -> Result<Vec<Document>, StoreError> {
        if let Some(gate) = &self.query_gate {
            gate.notified().await;
        }
        self.check()?;
        self.inner.query(collection, direction).await
    }

    async fn subscribe(
        &self,
        collection: &str,
        direction: Direction,
    ) -> Result<LiveQuery, StoreError> {
        self.check()?;
        self.inner.subscribe(collection, direction).await
    }

    async fn merge(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        self.record_write()?;
        self.inner.merge(collection, id, fields).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.record_write()?;
        self.inner.delete(collection, id).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check()
    }
}
