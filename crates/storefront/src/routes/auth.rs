//! Navbar login and logout.
//!
//! Login opens the same OTP modal as checkout, without a package; once the
//! code is verified the profile is fetched and cached and the page reloads.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use only_choice_core::OtpFlow;
use tracing::{info, instrument};

use crate::error::{Result, clear_sentry_user};
use crate::middleware::{HxRequest, SessionStore, redirect};
use crate::routes::checkout::{discard_open_flow, open};
use crate::state::AppState;

/// Open the modal in login mode.
#[instrument(skip(state, store))]
pub async fn login(
    State(state): State<AppState>,
    hx: HxRequest,
    store: SessionStore,
) -> Result<Response> {
    open(&state, hx, store, OtpFlow::login(), Vec::new()).await
}

/// Forget the credential, the cached profile and any open modal.
#[instrument(skip(state, store))]
pub async fn logout(
    State(state): State<AppState>,
    hx: HxRequest,
    mut store: SessionStore,
) -> Result<Response> {
    discard_open_flow(&state, &store).await?;
    store.clear_token();
    store.clear_cached_profile().await?;
    clear_sentry_user();
    info!("visitor logged out");

    Ok((store, redirect(hx, "/")).into_response())
}
