//! Authentication route handlers.
//!
//! Login and logout against the identity provider. The provider credential
//! lives in the browser session.

use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use super::{Banner, fill};
use crate::auth::gate::LOGIN_PATH;
use crate::error::clear_sentry_user;
use crate::filters;
use crate::forms::{LoginFields, LoginForm, Submission, login::AFTER_LOGIN};
use crate::navigation::Navigation;
use crate::state::AppState;
use crate::storage::SessionCache;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginFormData {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub email: String,
    pub banner: Option<Banner>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the login page.
pub async fn login_page() -> impl IntoResponse {
    LoginTemplate {
        email: String::new(),
        banner: None,
    }
}

/// Handle login form submission.
///
/// Success replaces the login page with `/admin`; anything else renders the
/// form again with its status.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginFormData>,
) -> Response {
    let client = Arc::new(state.auth_client(&session));
    let login = LoginForm::new(client);
    fill(
        login.cell(),
        LoginFields {
            email: form.email,
            password: form.password,
        },
    );

    if login.submit().await == Submission::Done {
        return AFTER_LOGIN.into_response();
    }

    let snapshot = login.cell().snapshot();
    LoginTemplate {
        email: snapshot.fields.email,
        banner: Banner::from_status(&snapshot.status),
    }
    .into_response()
}

/// Sign out, destroy the browser session and return to the login page.
pub async fn logout(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    state.auth_client(&session).sign_out().await;

    if let Err(e) = SessionCache::for_session(&session).clear().await {
        tracing::warn!(error = %e, "Failed to clear cached session");
    }

    // Also destroy the entire browser session
    if let Err(e) = session.flush().await {
        tracing::error!(error = %e, "Failed to flush session");
    }
    clear_sentry_user();

    Navigation::replace(LOGIN_PATH)
}
