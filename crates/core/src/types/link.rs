//! Link button records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Color, LinkId};

/// A link button shown on the public profile.
///
/// Links are only ever created and deleted; there is no in-place edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Store-assigned document id.
    pub id: LinkId,
    /// Button label.
    pub name: String,
    /// Absolute target URL.
    pub url: String,
    /// Button background color.
    pub background_color: Color,
    /// Button label color.
    pub text_color: Color,
    /// Store-assigned creation time; lists are ordered by it ascending.
    pub created_at: DateTime<Utc>,
}

/// The fields of a link before the store has assigned an id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLink {
    pub name: String,
    pub url: String,
    #[serde(rename = "bg")]
    pub background_color: Color,
    #[serde(rename = "color")]
    pub text_color: Color,
}
