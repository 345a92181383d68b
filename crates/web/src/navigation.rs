//! Navigation requests produced by controllers.

use axum::response::{IntoResponse, Redirect, Response};

/// Where the browser should go next, replacing the current history entry.
///
/// Sent as `303 See Other`, so the page that asked for it cannot be
/// reached again with the back button or a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    pub path: &'static str,
}

impl Navigation {
    #[must_use]
    pub const fn replace(path: &'static str) -> Self {
        Self { path }
    }
}

impl IntoResponse for Navigation {
    fn into_response(self) -> Response {
        Redirect::to(self.path).into_response()
    }
}
