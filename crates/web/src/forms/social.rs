//! Social links form.

use std::sync::Arc;

use linkbio_core::validation::{is_not_empty, is_valid_url};
use linkbio_core::{ErrorMessage, SocialLinksPatch, SocialNetwork, SuccessMessage, ValidationError};

use super::{FormCell, Submission};
use crate::backend::DocumentStore;
use crate::repository::SocialLinksRepository;

/// Social form fields. A `None` field was not part of the submission and
/// is left alone in the store.
pub type SocialFields = SocialLinksPatch;

/// Edits the singleton social links record.
pub struct SocialForm {
    cell: FormCell<SocialFields>,
    store: Arc<dyn DocumentStore>,
}

impl SocialForm {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            cell: FormCell::new(SocialFields::default()),
            store,
        }
    }

    #[must_use]
    pub const fn cell(&self) -> &FormCell<SocialFields> {
        &self.cell
    }

    /// Pre-fill the fields from the stored record. A failed read is logged
    /// and leaves the fields as they are.
    pub async fn load(&self) {
        match SocialLinksRepository::new(self.store.as_ref()).get().await {
            Ok(stored) => {
                let filled = self.cell.edit(|fields| {
                    for network in SocialNetwork::FORM_ORDER {
                        *fields.slot_mut(network) = Some(stored.get(network).to_owned());
                    }
                });
                if filled.is_err() {
                    tracing::debug!("Skipping social links prefill during submit");
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to load social links"),
        }
    }

    /// Validate and merge the submitted links. Success keeps the fields.
    pub async fn submit(&self) -> Submission {
        let Ok(fields) = self.cell.begin() else {
            return Submission::Busy;
        };

        let patch = match validate(&fields) {
            Ok(patch) => patch,
            Err(e) => {
                self.cell.fail(e.to_string());
                return Submission::Invalid;
            }
        };

        self.cell.start_write();
        match SocialLinksRepository::new(self.store.as_ref())
            .merge(&patch)
            .await
        {
            Ok(()) => {
                tracing::info!("Social links saved");
                self.cell.succeed(SuccessMessage::Saved, |_| {});
                Submission::Done
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to save social links");
                self.cell.fail(ErrorMessage::SaveFailed.as_str());
                Submission::Failed
            }
        }
    }
}

/// Each filled-in field must be a URL, checked in form order. Present
/// values are trimmed.
fn validate(fields: &SocialFields) -> Result<SocialLinksPatch, ValidationError> {
    let mut patch = SocialLinksPatch::default();

    for network in SocialNetwork::FORM_ORDER {
        let Some(value) = fields.get(network) else {
            continue;
        };
        let value = value.trim();
        if is_not_empty(value) && !is_valid_url(value) {
            return Err(ValidationError::InvalidUrl {
                network: Some(network),
            });
        }
        *patch.slot_mut(network) = Some(value.to_owned());
    }

    Ok(patch)
}
