//! Core types for linkbio.
//!
//! This module provides type-safe wrappers for the profile's domain concepts.

pub mod color;
pub mod email;
pub mod id;
pub mod link;
pub mod session;
pub mod social;

pub use color::{Color, ColorError};
pub use email::{Email, EmailError};
pub use id::*;
pub use link::{Link, NewLink};
pub use session::UserSession;
pub use social::{SocialLinks, SocialLinksPatch, SocialNetwork};
