//! Social links persistence.

use serde_json::Value;
use tracing::instrument;

use linkbio_core::{SocialLinks, SocialLinksPatch, SocialNetwork};

use super::to_fields;
use crate::backend::{DocumentStore, StoreError};

/// Collection holding the social links record.
pub const SOCIAL_COLLECTION: &str = "social";

/// Fixed id of the singleton social links document.
pub const SOCIAL_DOCUMENT_ID: &str = "link";

/// Repository for the singleton social links record.
pub struct SocialLinksRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> SocialLinksRepository<'a> {
    /// Create a new social links repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Read the record. A missing document or field reads as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub async fn get(&self) -> Result<SocialLinks, StoreError> {
        let Some(document) = self.store.get(SOCIAL_COLLECTION, SOCIAL_DOCUMENT_ID).await? else {
            return Ok(SocialLinks::default());
        };

        let field = |network: SocialNetwork| {
            document
                .fields
                .get(network.field())
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned()
        };

        Ok(SocialLinks {
            facebook: field(SocialNetwork::Facebook),
            instagram: field(SocialNetwork::Instagram),
            youtube: field(SocialNetwork::YouTube),
        })
    }

    /// Merge a patch into the record, creating it if needed. Fields the
    /// patch leaves out keep their stored value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    #[instrument(skip(self, patch))]
    pub async fn merge(&self, patch: &SocialLinksPatch) -> Result<(), StoreError> {
        self.store
            .merge(SOCIAL_COLLECTION, SOCIAL_DOCUMENT_ID, to_fields(patch)?)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::backend::memory::MemoryDocumentStore;

    #[tokio::test]
    async fn test_missing_record_reads_empty() {
        let store = MemoryDocumentStore::new();
        let social = SocialLinksRepository::new(&store).get().await.unwrap();
        assert_eq!(social, SocialLinks::default());
    }

    #[tokio::test]
    async fn test_merge_leaves_omitted_fields() {
        let store = MemoryDocumentStore::new();
        let repo = SocialLinksRepository::new(&store);
        repo.merge(&SocialLinksPatch {
            facebook: Some("https://facebook.com/a".to_owned()),
            instagram: Some("https://instagram.com/a".to_owned()),
            youtube: Some("https://youtube.com/@a".to_owned()),
        })
        .await
        .unwrap();

        repo.merge(&SocialLinksPatch {
            facebook: Some("https://facebook.com/b".to_owned()),
            ..SocialLinksPatch::default()
        })
        .await
        .unwrap();

        let social = repo.get().await.unwrap();
        assert_eq!(social.facebook, "https://facebook.com/b");
        assert_eq!(social.instagram, "https://instagram.com/a");
        assert_eq!(social.youtube, "https://youtube.com/@a");
    }

    #[tokio::test]
    async fn test_non_string_fields_read_empty() {
        let store = MemoryDocumentStore::new();
        store
            .merge(
                SOCIAL_COLLECTION,
                SOCIAL_DOCUMENT_ID,
                json!({"facebook": null, "youtube": 3}).as_object().cloned().unwrap(),
            )
            .await
            .unwrap();

        let social = SocialLinksRepository::new(&store).get().await.unwrap();
        assert!(social.is_empty());
    }
}
