//! Admin link management.
//!
//! Every handler here is gated by [`RequireSession`].

use std::convert::Infallible;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{
        IntoResponse, Redirect, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::Stream;
use serde::Deserialize;
use tracing::instrument;

use linkbio_core::validation::is_valid_color;
use linkbio_core::{Color, ErrorMessage, Link, LinkId, SuccessMessage, UserSession};

use super::{Banner, fill};
use crate::error::{AppError, Result};
use crate::filters;
use crate::forms::{Confirmation, DeleteLink, LinkFields, LinkForm, Submission};
use crate::middleware::RequireSession;
use crate::repository::LinkRepository;
use crate::state::AppState;
use crate::views::{LinkListState, LinkListView};

/// Server-sent event name carrying a rendered link list.
pub const LINKS_EVENT: &str = "links";

// =============================================================================
// Form and Query Types
// =============================================================================

/// Link creation form data.
#[derive(Debug, Deserialize)]
pub struct LinkFormData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_text_color")]
    pub text_color: String,
    #[serde(default = "default_background_color")]
    pub background_color: String,
}

fn default_text_color() -> String {
    Color::DEFAULT_TEXT.to_owned()
}

fn default_background_color() -> String {
    Color::DEFAULT_BACKGROUND.to_owned()
}

impl From<LinkFormData> for LinkFields {
    fn from(form: LinkFormData) -> Self {
        Self {
            name: form.name,
            url: form.url,
            text_color: form.text_color,
            background_color: form.background_color,
        }
    }
}

/// Delete confirmation form data.
#[derive(Debug, Deserialize)]
pub struct DeleteFormData {
    #[serde(default)]
    pub confirm: String,
}

impl DeleteFormData {
    fn confirmation(&self) -> Confirmation {
        if self.confirm == "yes" {
            Confirmation::Confirmed
        } else {
            Confirmation::Declined
        }
    }
}

/// Query parameters carrying the outcome of a redirecting action and the
/// colors the link form keeps after a save.
#[derive(Debug, Default, Deserialize)]
pub struct AdminQuery {
    pub notice: Option<String>,
    pub text_color: Option<String>,
    pub background_color: Option<String>,
}

impl AdminQuery {
    fn banner(&self) -> Option<Banner> {
        match self.notice.as_deref()? {
            "saved" => Some(Banner::success(SuccessMessage::Saved)),
            "deleted" => Some(Banner::success(SuccessMessage::Deleted)),
            "delete_failed" => Some(Banner::error(ErrorMessage::DeleteFailed)),
            _ => None,
        }
    }

    /// An empty link form; colors carried over only if they are valid.
    fn fields(&self) -> LinkFields {
        let kept = |color: &Option<String>| {
            color
                .as_deref()
                .filter(|c| is_valid_color(c))
                .map(str::to_owned)
        };
        let defaults = LinkFields::default();
        LinkFields {
            text_color: kept(&self.text_color).unwrap_or(defaults.text_color),
            background_color: kept(&self.background_color).unwrap_or(defaults.background_color),
            ..LinkFields::default()
        }
    }
}

/// Where a saved link redirects: the admin page with the kept colors.
fn saved_location(fields: &LinkFields) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("notice", "saved")
        .append_pair("text_color", &fields.text_color)
        .append_pair("background_color", &fields.background_color)
        .finish();
    format!("/admin?{query}")
}

// =============================================================================
// Templates
// =============================================================================

/// Admin page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin.html")]
pub struct AdminTemplate {
    pub email: Option<String>,
    pub fields: LinkFields,
    pub banner: Option<Banner>,
    pub links: Vec<Link>,
    pub list_error: Option<&'static str>,
}

/// Link list fragment, pushed over the event stream.
#[derive(Template)]
#[template(path = "admin/link_list.html")]
pub struct LinkListTemplate {
    pub links: Vec<Link>,
    pub list_error: Option<&'static str>,
}

impl From<LinkListState> for LinkListTemplate {
    fn from(state: LinkListState) -> Self {
        Self {
            links: state.links,
            list_error: state.last_error.map(|_| ErrorMessage::Network.as_str()),
        }
    }
}

/// Delete confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "confirm_delete.html")]
pub struct ConfirmDeleteTemplate {
    pub link: Link,
}

async fn admin_page(
    state: &AppState,
    user: &UserSession,
    fields: LinkFields,
    banner: Option<Banner>,
) -> AdminTemplate {
    let (links, list_error) = match LinkRepository::new(state.store()).list().await {
        Ok(links) => (links, None),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load links");
            (Vec::new(), Some(ErrorMessage::Network.as_str()))
        }
    };

    AdminTemplate {
        email: user.email.as_ref().map(ToString::to_string),
        fields,
        banner,
        links,
        list_error,
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the link form and the link list.
pub async fn index(
    State(state): State<AppState>,
    RequireSession(user): RequireSession,
    Query(query): Query<AdminQuery>,
) -> impl IntoResponse {
    admin_page(&state, &user, query.fields(), query.banner()).await
}

/// Handle link form submission.
///
/// A saved link redirects back to the admin page so a refresh cannot post
/// it twice; a rejected one renders the form again with its input.
#[instrument(skip_all, fields(user_id = %user.uid))]
pub async fn create_link(
    State(state): State<AppState>,
    RequireSession(user): RequireSession,
    Form(form): Form<LinkFormData>,
) -> Response {
    let link_form = LinkForm::new(state.documents());
    fill(link_form.cell(), form.into());
    let outcome = link_form.submit().await;

    let snapshot = link_form.cell().snapshot();
    if outcome == Submission::Done {
        return Redirect::to(&saved_location(&snapshot.fields)).into_response();
    }

    admin_page(
        &state,
        &user,
        snapshot.fields,
        Banner::from_status(&snapshot.status),
    )
    .await
    .into_response()
}

/// Stream the link list as rendered fragments, one per snapshot.
///
/// The live query is released when the browser disconnects.
pub async fn link_events(
    State(state): State<AppState>,
    RequireSession(_user): RequireSession,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let mut view = LinkListView::open(state.store()).await?;

    let stream = async_stream::stream! {
        while let Some(list) = view.next_update().await {
            match LinkListTemplate::from(list).render() {
                Ok(html) => yield Ok(Event::default().event(LINKS_EVENT).data(html)),
                Err(e) => tracing::error!(error = %e, "Failed to render link list"),
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Ask for confirmation before deleting a link.
pub async fn confirm_delete(
    State(state): State<AppState>,
    RequireSession(_user): RequireSession,
    Path(id): Path<String>,
) -> Result<ConfirmDeleteTemplate> {
    let link = LinkRepository::new(state.store())
        .get(&LinkId::new(id.as_str()))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("link {id}")))?;

    Ok(ConfirmDeleteTemplate { link })
}

/// Delete a link if the user confirmed.
#[instrument(skip_all, fields(user_id = %user.uid, link_id = %id))]
pub async fn delete_link(
    State(state): State<AppState>,
    RequireSession(user): RequireSession,
    Path(id): Path<String>,
    Form(form): Form<DeleteFormData>,
) -> Response {
    let delete = DeleteLink::new(state.documents(), LinkId::new(id));

    match delete.submit(form.confirmation()).await {
        Submission::Done => Redirect::to("/admin?notice=deleted").into_response(),
        Submission::Cancelled => Redirect::to("/admin").into_response(),
        Submission::Invalid | Submission::Failed | Submission::Busy => {
            Redirect::to("/admin?notice=delete_failed").into_response()
        }
    }
}
