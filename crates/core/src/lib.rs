//! linkbio core - Shared types library.
//!
//! This crate provides the types and rules shared by every linkbio component:
//! - `web` - Public profile page and the admin editor
//! - `cli` - Command-line tools for migrations and identity users
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Anything that talks to the identity provider or the
//! document store lives in `linkbio-web`.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, colors, links and sessions
//! - [`validation`] - Field checks run by every form before it writes
//! - [`messages`] - The fixed catalog of user-facing status messages

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod messages;
pub mod types;
pub mod validation;

pub use messages::{ErrorMessage, SuccessMessage};
pub use types::*;
pub use validation::ValidationError;
