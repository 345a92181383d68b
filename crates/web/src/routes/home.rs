//! Public profile page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use linkbio_core::Link;

use crate::filters;
use crate::state::AppState;
use crate::views::ProfileLoader;

/// One social network icon.
#[derive(Debug, Clone)]
pub struct SocialIcon {
    pub label: &'static str,
    pub field: &'static str,
    pub url: String,
}

/// Public profile template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub name: String,
    pub tagline: String,
    pub links: Vec<Link>,
    pub social: Vec<SocialIcon>,
}

/// Display the public profile.
///
/// Links and social links load concurrently; either failing renders as
/// empty.
#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>) -> impl IntoResponse {
    let profile = ProfileLoader::new(state.documents()).load().await;

    let social = profile
        .social
        .present()
        .into_iter()
        .map(|(network, url)| SocialIcon {
            label: network.label(),
            field: network.field(),
            url: url.to_owned(),
        })
        .collect();

    let profile_config = &state.config().profile;
    HomeTemplate {
        name: profile_config.name.clone(),
        tagline: profile_config.tagline.clone(),
        links: profile.links,
        social,
    }
}
