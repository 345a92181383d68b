//! Field validation shared by every form.
//!
//! These checks have no side effects and never panic; a bad value is
//! simply `false`.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::messages::ErrorMessage;
use crate::types::{Color, SocialNetwork};

/// `local@domain.tld` with no whitespace and no extra `@` in any part.
///
/// Consecutive dots and one-letter TLDs pass.
static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex"));

/// A form rejected before any external call was made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// One or more required fields are blank.
    #[error("{}", ErrorMessage::RequiredFields)]
    RequiredFields {
        /// Names of the blank fields, in form order.
        missing: Vec<&'static str>,
    },

    /// The email does not have the `local@domain.tld` shape.
    #[error("{}", ErrorMessage::InvalidEmail)]
    InvalidEmail,

    /// A URL field does not hold an absolute URL.
    #[error("{}{}", ErrorMessage::InvalidUrl, network_suffix(.network))]
    InvalidUrl {
        /// The social network the field belongs to, if any.
        network: Option<SocialNetwork>,
    },

    /// A color field is not a `#rrggbb` value.
    #[error("{}", ErrorMessage::InvalidColor)]
    InvalidColor,
}

fn network_suffix(network: &Option<SocialNetwork>) -> String {
    network.map(|n| format!(" ({n})")).unwrap_or_default()
}

/// True iff the text has non-whitespace content.
#[must_use]
pub fn is_not_empty(text: &str) -> bool {
    !text.trim().is_empty()
}

/// True iff the text looks like `local@domain.tld`.
#[must_use]
pub fn is_valid_email(text: &str) -> bool {
    EMAIL_PATTERN.is_match(text)
}

/// True iff the text parses as an absolute URL with a scheme and a host.
#[must_use]
pub fn is_valid_url(text: &str) -> bool {
    Url::parse(text).is_ok_and(|url| url.has_host())
}

/// True iff the text is a `#rrggbb` color.
#[must_use]
pub fn is_valid_color(text: &str) -> bool {
    Color::parse(text).is_ok()
}

/// Names of the fields whose values are blank, in input order.
#[must_use]
pub fn missing_required_fields(fields: &[(&'static str, &str)]) -> Vec<&'static str> {
    fields
        .iter()
        .filter(|(_, value)| !is_not_empty(value))
        .map(|(name, _)| *name)
        .collect()
}

/// Fail with [`ValidationError::RequiredFields`] if any field is blank.
///
/// # Errors
///
/// Returns the list of blank field names.
pub fn require(fields: &[(&'static str, &str)]) -> Result<(), ValidationError> {
    let missing = missing_required_fields(fields);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::RequiredFields { missing })
    }
}
