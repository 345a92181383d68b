//! The signed-in user as the application sees it.

use serde::{Deserialize, Serialize};

use super::{Email, UserId};

/// Minimal projection of the identity provider's signed-in user.
///
/// This is what gets mirrored into the browser's key-value storage once
/// the auth gate has confirmed a session. It is never edited by the
/// application; it only follows provider state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    /// Provider-assigned user id.
    pub uid: UserId,
    /// Account email, when the provider knows one.
    pub email: Option<Email>,
}
