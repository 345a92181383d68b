//! Session middleware configuration.
//!
//! The browser session is the key-value store the identity client keeps its
//! credential in. It is backed by `PostgreSQL` in production and by memory
//! for the memory backend and tests.

use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};

use crate::config::LinkbioConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "linkbio_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer over the given store.
///
/// The cookie is marked `Secure` when the public URL is HTTPS.
#[must_use]
pub fn create_session_layer<S>(store: S, config: &LinkbioConfig) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
