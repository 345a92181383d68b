//! Link button persistence.

use serde_json::Value;
use tracing::instrument;

use linkbio_core::{Link, LinkId, NewLink};

use super::to_fields;
use crate::backend::{Direction, Document, DocumentStore, LiveQuery, StoreError};

/// Collection holding one document per link.
pub const LINKS_COLLECTION: &str = "links";

/// Repository for link buttons.
pub struct LinkRepository<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> LinkRepository<'a> {
    /// Create a new link repository.
    #[must_use]
    pub const fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Store a new link and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    #[instrument(skip(self, link), fields(name = %link.name))]
    pub async fn create(&self, link: &NewLink) -> Result<LinkId, StoreError> {
        let id = self
            .store
            .create(LINKS_COLLECTION, to_fields(link)?)
            .await?;
        Ok(LinkId::new(id))
    }

    /// All links, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list(&self) -> Result<Vec<Link>, StoreError> {
        let documents = self
            .store
            .query(LINKS_COLLECTION, Direction::Ascending)
            .await?;
        Ok(links_from_documents(documents))
    }

    /// A single link.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the document is malformed.
    pub async fn get(&self, id: &LinkId) -> Result<Option<Link>, StoreError> {
        self.store
            .get(LINKS_COLLECTION, id.as_str())
            .await?
            .map(link_from_document)
            .transpose()
    }

    /// Follow the link list as it changes, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be started.
    pub async fn watch(&self) -> Result<LinkFeed, StoreError> {
        let live = self
            .store
            .subscribe(LINKS_COLLECTION, Direction::Ascending)
            .await?;
        Ok(LinkFeed { live })
    }

    /// Delete a link. Deleting a link that is already gone succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    #[instrument(skip(self), fields(link_id = %id))]
    pub async fn delete(&self, id: &LinkId) -> Result<(), StoreError> {
        self.store.delete(LINKS_COLLECTION, id.as_str()).await
    }
}

/// Live link list. Unsubscribes when dropped.
#[derive(Debug)]
pub struct LinkFeed {
    live: LiveQuery,
}

impl LinkFeed {
    /// Wait for the next full list. `None` once the feed has stopped.
    pub async fn next(&mut self) -> Option<Result<Vec<Link>, StoreError>> {
        self.live
            .next()
            .await
            .map(|snapshot| snapshot.map(links_from_documents))
    }

    /// Stop following changes. Further calls do nothing.
    pub fn unsubscribe(&mut self) {
        self.live.unsubscribe();
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.live.is_active()
    }
}

fn link_from_document(document: Document) -> Result<Link, StoreError> {
    let Document {
        id,
        created_at,
        fields,
    } = document;

    let stored: NewLink = serde_json::from_value(Value::Object(fields))
        .map_err(|e| StoreError::DataCorruption(format!("link {id}: {e}")))?;

    Ok(Link {
        id: LinkId::new(id),
        name: stored.name,
        url: stored.url,
        background_color: stored.background_color,
        text_color: stored.text_color,
        created_at,
    })
}

/// Malformed documents are logged and left out.
fn links_from_documents(documents: Vec<Document>) -> Vec<Link> {
    documents
        .into_iter()
        .filter_map(|document| match link_from_document(document) {
            Ok(link) => Some(link),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed link document");
                None
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use linkbio_core::Color;

    use super::*;
    use crate::backend::memory::MemoryDocumentStore;

    fn new_link(name: &str) -> NewLink {
        NewLink {
            name: name.to_owned(),
            url: format!("https://example.com/{name}"),
            background_color: Color::default_background(),
            text_color: Color::default_text(),
        }
    }

    #[tokio::test]
    async fn test_create_writes_short_field_names() {
        let store = MemoryDocumentStore::new();
        let repo = LinkRepository::new(&store);
        let id = repo.create(&new_link("blog")).await.unwrap();

        let doc = store.get(LINKS_COLLECTION, id.as_str()).await.unwrap().unwrap();
        assert_eq!(
            Value::Object(doc.fields),
            json!({
                "name": "blog",
                "url": "https://example.com/blog",
                "bg": "#121212",
                "color": "#f1f1f1",
            })
        );
    }

    #[tokio::test]
    async fn test_list_is_oldest_first_and_skips_malformed() {
        let store = MemoryDocumentStore::new();
        let repo = LinkRepository::new(&store);
        repo.create(&new_link("first")).await.unwrap();
        store
            .create(
                LINKS_COLLECTION,
                json!({"name": "broken"}).as_object().cloned().unwrap(),
            )
            .await
            .unwrap();
        repo.create(&new_link("second")).await.unwrap();

        let names: Vec<_> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_delete_removes_only_that_link() {
        let store = MemoryDocumentStore::new();
        let repo = LinkRepository::new(&store);
        let keep = repo.create(&new_link("keep")).await.unwrap();
        let gone = repo.create(&new_link("gone")).await.unwrap();

        repo.delete(&gone).await.unwrap();
        repo.delete(&gone).await.unwrap();

        let ids: Vec<_> = repo.list().await.unwrap().into_iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![keep]);
        assert!(repo.get(&gone).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_watch_follows_changes() {
        let store = MemoryDocumentStore::new();
        let repo = LinkRepository::new(&store);
        let mut feed = repo.watch().await.unwrap();
        assert!(feed.next().await.unwrap().unwrap().is_empty());

        repo.create(&new_link("new")).await.unwrap();
        let links = feed.next().await.unwrap().unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].name, "new");

        feed.unsubscribe();
        assert!(!feed.is_active());
    }
}
