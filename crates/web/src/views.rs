//! List views over the document store.
//!
//! - [`ProfileLoader`] - one-shot load of the public profile.
//! - [`LinkListView`] - the admin's live link list.

use std::sync::Arc;

use tokio::sync::watch;

use linkbio_core::{Link, SocialLinks};

use crate::backend::{DocumentStore, StoreError};
use crate::repository::{LinkFeed, LinkRepository, SocialLinksRepository};

// =============================================================================
// Public profile
// =============================================================================

/// Everything the public page shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub links: Vec<Link>,
    pub social: SocialLinks,
}

/// Load progress of the public profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileState {
    /// At least one read is still outstanding. Finished halves are kept.
    Loading {
        links: Option<Vec<Link>>,
        social: Option<SocialLinks>,
    },
    Ready(Profile),
}

impl ProfileState {
    const fn initial() -> Self {
        Self::Loading {
            links: None,
            social: None,
        }
    }
}

/// Loads the links and the social record concurrently.
pub struct ProfileLoader {
    store: Arc<dyn DocumentStore>,
    state: watch::Sender<ProfileState>,
}

impl ProfileLoader {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let (state, _) = watch::channel(ProfileState::initial());
        Self { store, state }
    }

    #[must_use]
    pub fn state(&self) -> ProfileState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ProfileState> {
        self.state.subscribe()
    }

    /// Run both reads and wait for them. Either failing is logged and
    /// reads as empty.
    pub async fn load(&self) -> Profile {
        self.state.send_replace(ProfileState::initial());

        let links = async {
            let links = LinkRepository::new(self.store.as_ref())
                .list()
                .await
                .unwrap_or_else(|e| {
                    tracing::error!(error = %e, "Failed to load links");
                    Vec::new()
                });
            self.state.send_modify(|state| {
                if let ProfileState::Loading { links: slot, .. } = state {
                    *slot = Some(links.clone());
                }
            });
            links
        };

        let social = async {
            let social = SocialLinksRepository::new(self.store.as_ref())
                .get()
                .await
                .unwrap_or_else(|e| {
                    tracing::error!(error = %e, "Failed to load social links");
                    SocialLinks::default()
                });
            self.state.send_modify(|state| {
                if let ProfileState::Loading { social: slot, .. } = state {
                    *slot = Some(social.clone());
                }
            });
            social
        };

        let (links, social) = tokio::join!(links, social);
        let profile = Profile { links, social };
        self.state.send_replace(ProfileState::Ready(profile.clone()));
        profile
    }
}

// =============================================================================
// Admin link list
// =============================================================================

/// What the admin list shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkListState {
    pub links: Vec<Link>,
    /// Most recent live-channel error; the list keeps its last contents.
    pub last_error: Option<String>,
}

/// Live link list. Unsubscribes when dropped.
pub struct LinkListView {
    feed: LinkFeed,
    state: watch::Sender<LinkListState>,
}

impl LinkListView {
    /// Start following the `links` collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be started.
    pub async fn open(store: &dyn DocumentStore) -> Result<Self, StoreError> {
        let feed = LinkRepository::new(store).watch().await?;
        let (state, _) = watch::channel(LinkListState::default());
        Ok(Self { feed, state })
    }

    #[must_use]
    pub fn state(&self) -> LinkListState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn watch(&self) -> watch::Receiver<LinkListState> {
        self.state.subscribe()
    }

    /// Wait for the next snapshot or error and apply it. `None` once the
    /// feed has stopped.
    pub async fn next_update(&mut self) -> Option<LinkListState> {
        match self.feed.next().await? {
            Ok(links) => self.state.send_modify(|state| {
                state.links = links;
                state.last_error = None;
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Live link list error");
                self.state
                    .send_modify(|state| state.last_error = Some(e.to_string()));
            }
        }
        Some(self.state())
    }

    /// Stop following changes.
    pub fn close(&mut self) {
        self.feed.unsubscribe();
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.feed.is_active()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use linkbio_core::{Color, NewLink, SocialLinksPatch};
    use tokio::sync::Notify;

    use super::*;
    use crate::backend::testing::RecordingStore;

    const YOUTUBE: &str = "https://youtube.com/@me";

    fn new_link(name: &str) -> NewLink {
        NewLink {
            name: name.to_owned(),
            url: format!("https://example.com/{name}"),
            background_color: Color::default_background(),
            text_color: Color::default_text(),
        }
    }

    async fn seed_profile(store: &RecordingStore) {
        LinkRepository::new(&store.inner)
            .create(&new_link("a"))
            .await
            .unwrap();
        SocialLinksRepository::new(&store.inner)
            .merge(&SocialLinksPatch {
                youtube: Some(YOUTUBE.to_owned()),
                ..SocialLinksPatch::default()
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_profile_starts_loading_and_ends_ready() {
        let store = RecordingStore::new();
        seed_profile(&store).await;

        let loader = ProfileLoader::new(Arc::new(store));
        assert!(matches!(loader.state(), ProfileState::Loading { .. }));

        let profile = loader.load().await;
        assert_eq!(profile.links.len(), 1);
        assert_eq!(profile.social.youtube, YOUTUBE);
        assert_eq!(loader.state(), ProfileState::Ready(profile));
    }

    #[tokio::test]
    async fn test_profile_stays_loading_until_links_arrive() {
        let links_gate = Arc::new(Notify::new());
        let store = RecordingStore::new().with_query_gate(Arc::clone(&links_gate));
        seed_profile(&store).await;

        let loader = ProfileLoader::new(Arc::new(store));
        let mut rx = loader.watch();

        let observe = async {
            let partial = rx
                .wait_for(|state| {
                    matches!(state, ProfileState::Loading { social: Some(_), .. })
                })
                .await
                .unwrap()
                .clone();
            let ProfileState::Loading { links, social } = partial else {
                panic!("profile should still be loading");
            };
            assert!(links.is_none());
            assert_eq!(social.unwrap().youtube, YOUTUBE);

            tokio::task::yield_now().await;
            assert!(matches!(loader.state(), ProfileState::Loading { .. }));
            links_gate.notify_one();
        };

        let (profile, ()) = tokio::join!(loader.load(), observe);
        assert_eq!(profile.links.len(), 1);
        assert_eq!(loader.state(), ProfileState::Ready(profile));
    }

    #[tokio::test]
    async fn test_profile_stays_loading_until_social_arrives() {
        let social_gate = Arc::new(Notify::new());
        let store = RecordingStore::new().with_get_gate(Arc::clone(&social_gate));
        seed_profile(&store).await;

        let loader = ProfileLoader::new(Arc::new(store));
        let mut rx = loader.watch();

        let observe = async {
            let partial = rx
                .wait_for(|state| {
                    matches!(state, ProfileState::Loading { links: Some(_), .. })
                })
                .await
                .unwrap()
                .clone();
            let ProfileState::Loading { links, social } = partial else {
                panic!("profile should still be loading");
            };
            let names: Vec<_> = links.unwrap().into_iter().map(|l| l.name).collect();
            assert_eq!(names, vec!["a"]);
            assert!(social.is_none());

            tokio::task::yield_now().await;
            assert!(matches!(loader.state(), ProfileState::Loading { .. }));
            social_gate.notify_one();
        };

        let (profile, ()) = tokio::join!(loader.load(), observe);
        assert_eq!(profile.social.youtube, YOUTUBE);
        assert_eq!(loader.state(), ProfileState::Ready(profile));
    }

    #[tokio::test]
    async fn test_profile_failures_degrade_to_empty() {
        let store = RecordingStore::new();
        store.fail();
        let loader = ProfileLoader::new(Arc::new(store));

        let profile = loader.load().await;
        assert_eq!(profile, Profile::default());
        assert!(matches!(loader.state(), ProfileState::Ready(_)));
    }

    #[tokio::test]
    async fn test_link_list_replaces_on_each_snapshot() {
        let store = RecordingStore::new();
        let repo = LinkRepository::new(&store.inner);
        repo.create(&new_link("a")).await.unwrap();

        let mut view = LinkListView::open(&store).await.unwrap();
        let first = view.next_update().await.unwrap();
        assert_eq!(first.links.len(), 1);

        repo.create(&new_link("b")).await.unwrap();
        let second = view.next_update().await.unwrap();
        let names: Vec<_> = second.links.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(second.last_error.is_none());
    }

    #[tokio::test]
    async fn test_link_list_close_stops_updates() {
        let store = RecordingStore::new();
        let mut view = LinkListView::open(&store).await.unwrap();
        view.next_update().await.unwrap();

        view.close();
        view.close();
        assert!(!view.is_open());
        assert!(view.next_update().await.is_none());
    }
}
