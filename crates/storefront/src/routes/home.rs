//! Landing page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::content::{LANDING, Landing, PricingCard, pricing_cards};
use crate::error::Result;
use crate::filters;
use crate::middleware::SessionStore;
use crate::routes::checkout::ModalView;
use crate::services::session_restore::{Viewer, restore};
use crate::state::AppState;

/// What the navbar shows on the right.
#[derive(Debug, Clone, Default)]
pub struct NavbarView {
    pub signed_in: bool,
    pub name: String,
    pub initial: String,
    pub image: Option<String>,
}

impl From<&Viewer> for NavbarView {
    fn from(viewer: &Viewer) -> Self {
        viewer.profile().map_or_else(Self::default, |profile| Self {
            signed_in: true,
            name: profile.display_name().to_owned(),
            initial: profile.initial(),
            image: profile.image.clone().filter(|url| url.starts_with("https://")),
        })
    }
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub landing: &'static Landing,
    pub pricing: Vec<PricingCard>,
    pub navbar: NavbarView,
    /// Open OTP modal, rendered server-side for plain form posts and reloads.
    pub modal: Option<ModalView>,
}

/// Display the landing page.
#[instrument(skip(state, store))]
pub async fn home(State(state): State<AppState>, mut store: SessionStore) -> Result<Response> {
    let viewer = restore(state.identity(), &mut store).await;
    let flash = store.take_flash().await;

    let modal = match store.load_flow().await {
        Some(flow) if state.attempts().is_open(flow.attempt()) => {
            Some(ModalView::new(&flow, flash))
        }
        Some(_) => {
            store.clear_flow().await?;
            None
        }
        None => None,
    };

    let template = HomeTemplate {
        landing: &LANDING,
        pricing: pricing_cards(),
        navbar: NavbarView::from(&viewer),
        modal,
    };
    Ok((store, template).into_response())
}
