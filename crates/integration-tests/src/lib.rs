//! End-to-end test harness for linkbio.
//!
//! [`TestApp::spawn`] boots the full router with the memory backend on an
//! ephemeral port and hands back a cookie-keeping HTTP client that does not
//! follow redirects, so tests can assert on every `Location`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p linkbio-integration-tests
//! ```

use std::sync::Arc;

use reqwest::{Client, Response, redirect::Policy};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_sessions::MemoryStore;

use linkbio_core::{Email, Link, NewLink, SocialLinks, SocialLinksPatch};
use linkbio_web::backend::memory::{MemoryDocumentStore, MemoryIdentityProvider};
use linkbio_web::build_app;
use linkbio_web::config::LinkbioConfig;
use linkbio_web::repository::{LinkRepository, SocialLinksRepository};
use linkbio_web::state::AppState;

/// Email of the seeded admin user.
pub const ADMIN_EMAIL: &str = "admin@example.com";
/// Password of the seeded admin user.
pub const ADMIN_PASSWORD: &str = "integration-secret";
/// Heading of the public profile.
pub const PROFILE_NAME: &str = "Integration Links";

/// A running application.
pub struct TestApp {
    pub base_url: String,
    pub client: Client,
    /// The store behind the app, for seeding and assertions.
    pub documents: MemoryDocumentStore,
    server: JoinHandle<()>,
}

impl TestApp {
    /// Boot the app with one admin user and empty collections.
    ///
    /// # Panics
    ///
    /// Panics if the server cannot be started.
    pub async fn spawn() -> Self {
        let config = LinkbioConfig::from_lookup(|key| match key {
            "LINKBIO_BACKEND" => Some("memory".to_owned()),
            "LINKBIO_BASE_URL" => Some("http://127.0.0.1".to_owned()),
            "LINKBIO_PROFILE_NAME" => Some(PROFILE_NAME.to_owned()),
            _ => None,
        })
        .expect("Failed to build test configuration");

        let identity = MemoryIdentityProvider::new(config.token_ttl);
        let email = Email::parse(ADMIN_EMAIL).expect("Invalid admin email");
        identity
            .add_user(&email, ADMIN_PASSWORD)
            .await
            .expect("Failed to seed admin user");

        let documents = MemoryDocumentStore::new();
        let state = AppState::new(config, Arc::new(identity), Arc::new(documents.clone()));
        let app = build_app(state, MemoryStore::default());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local address");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server error");
        });

        Self {
            base_url: format!("http://{addr}"),
            client: new_client(),
            documents,
            server,
        }
    }

    /// Absolute URL for a path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET a path with the app's client.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send request")
    }

    /// POST a form to a path with the app's client.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("Failed to send request")
    }

    /// Sign in as the seeded admin.
    ///
    /// # Panics
    ///
    /// Panics if sign-in does not redirect to the admin page.
    pub async fn login(&self) {
        let response = self
            .post_form(
                "/login",
                &[("email", ADMIN_EMAIL), ("password", ADMIN_PASSWORD)],
            )
            .await;
        assert_eq!(response.status(), 303, "login should redirect");
        assert_eq!(location(&response), Some("/admin"));
    }

    /// Store a link directly.
    ///
    /// # Panics
    ///
    /// Panics if the write fails.
    pub async fn seed_link(&self, link: &NewLink) {
        LinkRepository::new(&self.documents)
            .create(link)
            .await
            .expect("Failed to seed link");
    }

    /// Merge social links directly.
    ///
    /// # Panics
    ///
    /// Panics if the write fails.
    pub async fn seed_social(&self, patch: &SocialLinksPatch) {
        SocialLinksRepository::new(&self.documents)
            .merge(patch)
            .await
            .expect("Failed to seed social links");
    }

    /// Stored links, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the read fails.
    pub async fn links(&self) -> Vec<Link> {
        LinkRepository::new(&self.documents)
            .list()
            .await
            .expect("Failed to list links")
    }

    /// The stored social links.
    ///
    /// # Panics
    ///
    /// Panics if the read fails.
    pub async fn social(&self) -> SocialLinks {
        SocialLinksRepository::new(&self.documents)
            .get()
            .await
            .expect("Failed to read social links")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// A client with its own cookie jar that does not follow redirects.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn new_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// The `Location` header of a response.
#[must_use]
pub fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|value| value.to_str().ok())
}
