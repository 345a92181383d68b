//! Authentication extractor for admin routes.
//!
//! [`RequireSession`] runs the auth gate for the request: it restores the
//! identity client from the browser session and waits for the gate to
//! settle. Protected handlers only run once the gate is `Authenticated`.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use linkbio_core::UserSession;

use crate::auth::{AuthGate, GateView, gate::LOGIN_PATH};
use crate::error::set_sentry_user;
use crate::navigation::Navigation;
use crate::state::AppState;
use crate::storage::SessionCache;

/// Extractor that requires a signed-in admin.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireSession(session): RequireSession,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", session.uid)
/// }
/// ```
pub struct RequireSession(pub UserSession);

/// Returned when the gate does not let the request through.
#[derive(Debug)]
pub enum AuthRejection {
    /// Send the browser to the login page (for HTML requests).
    Redirect(Navigation),
    /// Unauthorized response (for event streams).
    Unauthorized,
    /// The session layer is missing from the stack.
    MissingSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Redirect(navigation) => navigation.into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::MissingSession => {
                tracing::error!("Session layer missing from the router");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

impl FromRequestParts<AppState> for RequireSession {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::MissingSession)?;

        let client = state.auth_client(&session);
        let mut gate = AuthGate::new(
            client.on_session_change(),
            SessionCache::for_session(&session),
        );
        tokio::join!(client.restore(), gate.settled());

        match gate.view() {
            GateView::Protected(user) => {
                set_sentry_user(&user.uid, user.email.as_ref().map(|e| e.as_str()));
                Ok(Self(user))
            }
            // Loading only remains if the client went away before answering.
            GateView::Redirect(_) | GateView::Loading if is_event_stream(parts) => {
                Err(AuthRejection::Unauthorized)
            }
            GateView::Redirect(navigation) => Err(AuthRejection::Redirect(navigation)),
            GateView::Loading => Err(AuthRejection::Redirect(Navigation::replace(LOGIN_PATH))),
        }
    }
}

fn is_event_stream(parts: &Parts) -> bool {
    parts
        .headers
        .get(axum::http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/event-stream"))
}
