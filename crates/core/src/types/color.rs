//! CSS color values for link buttons.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Color`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorError {
    /// The input is not a `#rrggbb` hex color.
    #[error("color must be a #rrggbb hex value, got {0:?}")]
    NotHex(String),
}

/// A `#rrggbb` hex color, as produced by an HTML color input.
///
/// Colors end up inside inline `style` attributes, so only the strict hex
/// form is accepted. Parsing lowercases the digits.
///
/// ```
/// use linkbio_core::Color;
///
/// assert_eq!(Color::parse("#F1F1F1").unwrap().as_str(), "#f1f1f1");
/// assert!(Color::parse("red").is_err());
/// assert!(Color::parse("#fff").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(String);

impl Color {
    /// Default text color for new links.
    pub const DEFAULT_TEXT: &'static str = "#f1f1f1";
    /// Default background color for new links.
    pub const DEFAULT_BACKGROUND: &'static str = "#121212";

    /// Parse a color.
    ///
    /// # Errors
    ///
    /// Returns [`ColorError::NotHex`] unless the input is `#` followed by
    /// exactly six hex digits.
    pub fn parse(s: &str) -> Result<Self, ColorError> {
        let digits = s
            .strip_prefix('#')
            .filter(|d| d.len() == 6 && d.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| ColorError::NotHex(s.to_owned()))?;
        Ok(Self(format!("#{}", digits.to_ascii_lowercase())))
    }

    /// The default link text color.
    #[must_use]
    pub fn default_text() -> Self {
        Self(Self::DEFAULT_TEXT.to_owned())
    }

    /// The default link background color.
    #[must_use]
    pub fn default_background() -> Self {
        Self(Self::DEFAULT_BACKGROUND.to_owned())
    }

    /// Returns the color as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Color {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.0
    }
}
