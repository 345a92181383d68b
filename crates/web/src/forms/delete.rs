//! Link deletion with confirmation.

use std::sync::Arc;

use linkbio_core::{ErrorMessage, LinkId, SuccessMessage};

use super::{FormCell, Submission};
use crate::backend::DocumentStore;
use crate::repository::LinkRepository;

/// The user's answer to "delete this link?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

/// Deletes one link after explicit confirmation.
pub struct DeleteLink {
    cell: FormCell<LinkId>,
    store: Arc<dyn DocumentStore>,
}

impl DeleteLink {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, id: LinkId) -> Self {
        Self {
            cell: FormCell::new(id),
            store,
        }
    }

    #[must_use]
    pub const fn cell(&self) -> &FormCell<LinkId> {
        &self.cell
    }

    /// Delete the link if confirmed. Declining changes nothing.
    pub async fn submit(&self, confirmation: Confirmation) -> Submission {
        if confirmation == Confirmation::Declined {
            return Submission::Cancelled;
        }

        let Ok(id) = self.cell.begin() else {
            return Submission::Busy;
        };

        self.cell.start_write();
        match LinkRepository::new(self.store.as_ref()).delete(&id).await {
            Ok(()) => {
                tracing::info!(link_id = %id, "Link deleted");
                self.cell.succeed(SuccessMessage::Deleted, |_| {});
                Submission::Done
            }
            Err(e) => {
                tracing::error!(error = %e, link_id = %id, "Failed to delete link");
                self.cell.fail(ErrorMessage::DeleteFailed.as_str());
                Submission::Failed
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use linkbio_core::{Color, NewLink};

    use super::*;
    use crate::backend::testing::RecordingStore;
    use crate::forms::FormStatus;

    async fn seed(store: &RecordingStore, names: &[&str]) -> Vec<LinkId> {
        let repo = LinkRepository::new(&store.inner);
        let mut ids = Vec::new();
        for name in names {
            ids.push(
                repo.create(&NewLink {
                    name: (*name).to_owned(),
                    url: format!("https://example.com/{name}"),
                    background_color: Color::default_background(),
                    text_color: Color::default_text(),
                })
                .await
                .unwrap(),
            );
        }
        ids
    }

    #[tokio::test]
    async fn test_declined_changes_nothing() {
        let store = RecordingStore::new();
        let ids = seed(&store, &["a", "b"]).await;
        let delete = DeleteLink::new(Arc::new(store.clone()), ids[0].clone());

        assert_eq!(delete.submit(Confirmation::Declined).await, Submission::Cancelled);
        assert_eq!(delete.cell().status(), FormStatus::Idle);
        assert_eq!(store.writes(), 0);
        assert_eq!(LinkRepository::new(&store.inner).list().await.unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmed_removes_exactly_one() {
        let store = RecordingStore::new();
        let ids = seed(&store, &["a", "b", "c"]).await;
        let delete = DeleteLink::new(Arc::new(store.clone()), ids[1].clone());

        assert_eq!(delete.submit(Confirmation::Confirmed).await, Submission::Done);
        assert_eq!(store.writes(), 1);

        let remaining: Vec<_> = LinkRepository::new(&store.inner)
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(remaining, vec![ids[0].clone(), ids[2].clone()]);
    }

    #[tokio::test]
    async fn test_failure_shows_delete_message() {
        let store = RecordingStore::new();
        let ids = seed(&store, &["a"]).await;
        store.fail();
        let delete = DeleteLink::new(Arc::new(store.clone()), ids[0].clone());

        assert_eq!(delete.submit(Confirmation::Confirmed).await, Submission::Failed);
        assert_eq!(
            delete.cell().status(),
            FormStatus::Failed("Could not delete. Please try again.".to_owned())
        );
    }
}
