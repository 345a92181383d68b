//! Link creation form.

use std::sync::Arc;

use linkbio_core::validation::{is_valid_url, require};
use linkbio_core::{Color, ErrorMessage, NewLink, SuccessMessage, ValidationError};

use super::{FormCell, Submission};
use crate::backend::DocumentStore;
use crate::repository::LinkRepository;

/// Link form fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFields {
    pub name: String,
    pub url: String,
    pub text_color: String,
    pub background_color: String,
}

impl Default for LinkFields {
    fn default() -> Self {
        Self {
            name: String::new(),
            url: String::new(),
            text_color: Color::DEFAULT_TEXT.to_owned(),
            background_color: Color::DEFAULT_BACKGROUND.to_owned(),
        }
    }
}

/// Creates link buttons.
pub struct LinkForm {
    cell: FormCell<LinkFields>,
    store: Arc<dyn DocumentStore>,
}

impl LinkForm {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            cell: FormCell::new(LinkFields::default()),
            store,
        }
    }

    #[must_use]
    pub const fn cell(&self) -> &FormCell<LinkFields> {
        &self.cell
    }

    /// Validate and store a new link. Success clears the name and URL and
    /// keeps both colors.
    pub async fn submit(&self) -> Submission {
        let Ok(fields) = self.cell.begin() else {
            return Submission::Busy;
        };

        let link = match validate(&fields) {
            Ok(link) => link,
            Err(e) => {
                self.cell.fail(e.to_string());
                return Submission::Invalid;
            }
        };

        self.cell.start_write();
        match LinkRepository::new(self.store.as_ref()).create(&link).await {
            Ok(id) => {
                tracing::info!(link_id = %id, "Link created");
                self.cell.succeed(SuccessMessage::Saved, |f| {
                    f.name.clear();
                    f.url.clear();
                });
                Submission::Done
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to create link");
                self.cell.fail(ErrorMessage::SaveFailed.as_str());
                Submission::Failed
            }
        }
    }
}

fn validate(fields: &LinkFields) -> Result<NewLink, ValidationError> {
    require(&[("name", fields.name.as_str()), ("url", fields.url.as_str())])?;

    let url = fields.url.trim();
    if !is_valid_url(url) {
        return Err(ValidationError::InvalidUrl { network: None });
    }

    let text_color =
        Color::parse(&fields.text_color).map_err(|_| ValidationError::InvalidColor)?;
    let background_color =
        Color::parse(&fields.background_color).map_err(|_| ValidationError::InvalidColor)?;

    Ok(NewLink {
        name: fields.name.trim().to_owned(),
        url: url.to_owned(),
        background_color,
        text_color,
    })
}
