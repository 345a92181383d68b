//! User-facing status messages.
//!
//! Every message a form can show comes from this fixed catalog. Remote
//! failures are always mapped onto one of these; raw provider errors go to
//! the logs only.

use core::fmt;

/// Failure messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorMessage {
    RequiredFields,
    InvalidEmail,
    InvalidUrl,
    InvalidColor,
    LoginFailed,
    SaveFailed,
    DeleteFailed,
    Network,
}

impl ErrorMessage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RequiredFields => "Fill in all required fields!",
            Self::InvalidEmail => "Please enter a valid email.",
            Self::InvalidUrl => "Please enter a valid URL.",
            Self::InvalidColor => "Please pick a valid color.",
            Self::LoginFailed => "Login failed. Check your credentials.",
            Self::SaveFailed => "Could not save. Please try again.",
            Self::DeleteFailed => "Could not delete. Please try again.",
            Self::Network => "Connection error. Check your internet connection.",
        }
    }
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Success messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuccessMessage {
    LoggedIn,
    Saved,
    Deleted,
}

impl SuccessMessage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LoggedIn => "Signed in successfully!",
            Self::Saved => "Saved successfully!",
            Self::Deleted => "Deleted successfully!",
        }
    }
}

impl fmt::Display for SuccessMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
