//! Typed access to the document store.
//!
//! Each repository borrows a [`DocumentStore`] and converts between stored
//! documents and the domain types from `linkbio-core`.

mod links;
mod social;

pub use links::{LINKS_COLLECTION, LinkFeed, LinkRepository};
pub use social::{SOCIAL_COLLECTION, SOCIAL_DOCUMENT_ID, SocialLinksRepository};

use serde::Serialize;
use serde_json::Value;

use crate::backend::{Fields, StoreError};

/// Serialize a value into document fields.
fn to_fields<T: Serialize>(value: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(StoreError::DataCorruption(format!(
            "expected an object, got {other}"
        ))),
        Err(e) => Err(StoreError::DataCorruption(e.to_string())),
    }
}
