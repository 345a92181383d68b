//! Social links editor.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Form, extract::State, response::IntoResponse};
use serde::Deserialize;
use tracing::instrument;

use linkbio_core::SocialNetwork;

use super::{Banner, fill};
use crate::filters;
use crate::forms::{SocialFields, SocialForm};
use crate::middleware::RequireSession;
use crate::state::AppState;

/// Social links form data. A field missing from the post is left alone.
#[derive(Debug, Default, Deserialize)]
pub struct SocialFormData {
    pub facebook: Option<String>,
    pub instagram: Option<String>,
    pub youtube: Option<String>,
}

impl From<SocialFormData> for SocialFields {
    fn from(form: SocialFormData) -> Self {
        Self {
            facebook: form.facebook,
            instagram: form.instagram,
            youtube: form.youtube,
        }
    }
}

/// One input row of the social form.
#[derive(Debug, Clone)]
pub struct SocialInput {
    pub label: &'static str,
    pub field: &'static str,
    pub value: String,
}

/// Social links page template.
#[derive(Template, WebTemplate)]
#[template(path = "social.html")]
pub struct SocialTemplate {
    pub inputs: Vec<SocialInput>,
    pub banner: Option<Banner>,
}

impl SocialTemplate {
    fn new(fields: &SocialFields, banner: Option<Banner>) -> Self {
        let inputs = SocialNetwork::FORM_ORDER
            .into_iter()
            .map(|network| SocialInput {
                label: network.label(),
                field: network.field(),
                value: fields.get(network).unwrap_or_default().to_owned(),
            })
            .collect();
        Self { inputs, banner }
    }
}

/// Display the social links form, pre-filled from the stored record.
pub async fn show(
    State(state): State<AppState>,
    RequireSession(_user): RequireSession,
) -> impl IntoResponse {
    let form = SocialForm::new(state.documents());
    form.load().await;
    SocialTemplate::new(&form.cell().fields(), None)
}

/// Handle social links form submission.
#[instrument(skip_all, fields(user_id = %user.uid))]
pub async fn save(
    State(state): State<AppState>,
    RequireSession(user): RequireSession,
    Form(posted): Form<SocialFormData>,
) -> impl IntoResponse {
    let form = SocialForm::new(state.documents());
    fill(form.cell(), posted.into());
    form.submit().await;

    let snapshot = form.cell().snapshot();
    SocialTemplate::new(&snapshot.fields, Banner::from_status(&snapshot.status))
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_inputs_follow_form_order() {
        let fields = SocialFields {
            youtube: Some("https://youtube.com/@me".to_owned()),
            ..SocialFields::default()
        };
        let template = SocialTemplate::new(&fields, None);

        let names: Vec<_> = template.inputs.iter().map(|i| i.field).collect();
        assert_eq!(names, vec!["facebook", "instagram", "youtube"]);
        assert_eq!(template.inputs[2].value, "https://youtube.com/@me");
        assert_eq!(template.inputs[0].value, "");
    }
}
