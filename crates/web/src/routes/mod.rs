//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Public profile
//!
//! # Auth
//! GET  /login                     - Login page
//! POST /login                     - Login action
//! POST /logout                    - Logout action
//!
//! # Admin (gated by RequireSession)
//! GET  /admin                     - Link form and live link list
//! POST /admin/links               - Create a link
//! GET  /admin/links/events        - Link list fragments (server-sent events)
//! GET  /admin/links/{id}/delete   - Delete confirmation page
//! POST /admin/links/{id}/delete   - Confirm or decline the delete
//! GET  /admin/social              - Social links form
//! POST /admin/social              - Save social links
//! ```

pub mod admin;
pub mod auth;
pub mod home;
pub mod social;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use linkbio_core::{ErrorMessage, SuccessMessage};

use crate::filters;
use crate::forms::{FormCell, FormStatus};
use crate::state::AppState;

/// A status line shown above a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub message: String,
    pub is_error: bool,
}

impl Banner {
    /// The banner for a form status, if it shows one.
    #[must_use]
    pub fn from_status(status: &FormStatus) -> Option<Self> {
        let message = status.message()?.to_owned();
        Some(Self {
            message,
            is_error: status.is_error(),
        })
    }

    #[must_use]
    pub fn success(message: SuccessMessage) -> Self {
        Self {
            message: message.as_str().to_owned(),
            is_error: false,
        }
    }

    #[must_use]
    pub fn error(message: ErrorMessage) -> Self {
        Self {
            message: message.as_str().to_owned(),
            is_error: true,
        }
    }
}

/// Copy posted values into a freshly built form.
fn fill<F>(cell: &FormCell<F>, posted: F)
where
    F: Clone + Send + Sync + 'static,
{
    if cell.edit(|fields| *fields = posted).is_err() {
        tracing::warn!("Posted values ignored: form already submitting");
    }
}

/// 404 page template.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate;

/// Fallback for unknown paths.
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, NotFoundTemplate)
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin", get(admin::index))
        .route("/admin/links", post(admin::create_link))
        .route("/admin/links/events", get(admin::link_events))
        .route(
            "/admin/links/{id}/delete",
            get(admin::confirm_delete).post(admin::delete_link),
        )
        .route("/admin/social", get(social::show).post(social::save))
}

/// Create all application routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
        .merge(admin_routes())
        .fallback(not_found)
}
