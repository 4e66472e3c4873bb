//! OTP modal route handlers (HTMX fragments).
//!
//! Each POST applies one intent to the flow stored in the session, runs the
//! resulting commands and answers with the re-rendered modal. Plain form
//! posts (no htmx) are redirected to `/`, which renders the modal from the
//! session, with any rejection message carried as a flash.
//!
//! A request holds its attempt's lock from loading the flow until the session
//! record is written, so a submission queued behind it always sees its result.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use only_choice_core::{
    AttemptId, Command, CourseStatus, FlowMode, OtpFlow, Package, PackageType, PackageTypeError,
    Rejection, Step,
};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::{AppError, Result};
use crate::middleware::{HxRequest, SessionStore, redirect};
use crate::services::checkout::{self, AttemptUnavailable, Outcome, breadcrumb};
use crate::state::AppState;

// =============================================================================
// View
// =============================================================================

/// Everything the modal partial needs, flattened from an [`OtpFlow`].
#[derive(Debug, Clone)]
pub struct ModalView {
    pub attempt: String,
    pub step: &'static str,
    /// Package and price shown above the form; `None` for a navbar login.
    pub badge: Option<String>,
    pub email: String,
    pub name: String,
    pub phone: String,
    pub error: Option<String>,
    pub can_verify: bool,
    /// Why verify is unavailable after the course lookup failed.
    pub course_note: Option<String>,
}

impl ModalView {
    /// `message` (usually a rejection) takes precedence over the flow's own
    /// inline notice.
    #[must_use]
    pub fn new(flow: &OtpFlow, message: Option<String>) -> Self {
        let badge = match flow.mode() {
            FlowMode::Checkout { package_type } => Some(badge(package_type)),
            FlowMode::Login => None,
        };
        let error = match flow.step() {
            Step::Error { message } => Some(message.clone()),
            _ => message.or_else(|| flow.notice().map(str::to_owned)),
        };
        // The lookup runs inside the request that opens the modal, so a
        // rendered flow is never still pending.
        let course_note = match flow.course() {
            CourseStatus::Failed(reason) => Some(reason.clone()),
            CourseStatus::Pending | CourseStatus::NotRequired | CourseStatus::Resolved(_) => None,
        };
        let (name, phone) = flow.details().map_or_else(Default::default, |d| {
            (d.name.clone(), d.phone.as_str().to_owned())
        });

        Self {
            attempt: flow.attempt().to_string(),
            step: flow.step().kind().as_str(),
            badge,
            email: flow.email().map(|e| e.as_str().to_owned()).unwrap_or_default(),
            name,
            phone,
            error,
            can_verify: flow.can_verify(),
            course_note,
        }
    }
}

fn badge(package_type: PackageType) -> String {
    let package = Package::for_type(package_type);
    let title = match package_type {
        PackageType::Regular => "Full Access",
        PackageType::Demo => package.label,
    };
    format!("{title} \u{2014} {}", package.price.display())
}

/// OTP modal fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/checkout_modal.html")]
pub struct CheckoutModalTemplate {
    pub modal: ModalView,
}

/// Full page that navigates to the payment page on its own.
#[derive(Template, WebTemplate)]
#[template(path = "handoff.html")]
pub struct HandoffTemplate {
    pub url: String,
}

// =============================================================================
// Forms
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct StartForm {
    #[serde(default)]
    pub package_type: String,
}

#[derive(Debug, Deserialize)]
pub struct AttemptForm {
    #[serde(default)]
    pub attempt: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailForm {
    #[serde(default)]
    pub attempt: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Deserialize)]
pub struct OtpForm {
    #[serde(default)]
    pub attempt: String,
    #[serde(default)]
    pub otp: String,
}

#[derive(Deserialize)]
pub struct DetailsForm {
    #[serde(default)]
    pub attempt: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
}

// =============================================================================
// Shared plumbing
// =============================================================================

/// Close whatever modal the visitor had open before starting another.
pub(crate) async fn discard_open_flow(state: &AppState, store: &SessionStore) -> Result<()> {
    if let Some(flow) = store.load_flow().await {
        state.attempts().close(flow.attempt()).await;
        store.clear_flow().await?;
    }
    Ok(())
}

/// Register a fresh flow, run its opening commands and render it.
pub(crate) async fn open(
    state: &AppState,
    hx: HxRequest,
    mut store: SessionStore,
    mut flow: OtpFlow,
    commands: Vec<Command>,
) -> Result<Response> {
    discard_open_flow(state, &store).await?;
    state.attempts().open(flow.attempt()).await;
    breadcrumb(&flow, "modal opened");

    let Ok(guard) = state.attempts().acquire(flow.attempt()).await else {
        return settle(state, hx, store, &flow, Outcome::Abandoned).await;
    };
    let record = store.record();
    let outcome = checkout::run(state, &mut store, &mut flow, commands).await;
    if outcome == Outcome::Abandoned {
        return settle(state, hx, store, &flow, outcome).await;
    }
    let response = settle(state, hx, store, &flow, outcome).await?;
    record.save().await?;
    drop(guard);
    Ok(response)
}

/// The stored flow, if it belongs to `attempt`.
async fn load_open(store: &SessionStore, attempt: AttemptId) -> Option<OtpFlow> {
    store
        .load_flow()
        .await
        .filter(|flow| flow.attempt() == attempt)
}

/// Apply `intent` to the stored flow named by `attempt` and run the result.
async fn dispatch<F>(
    state: &AppState,
    hx: HxRequest,
    mut store: SessionStore,
    attempt: &str,
    intent: F,
) -> Result<Response>
where
    F: FnOnce(&mut OtpFlow) -> std::result::Result<Vec<Command>, Rejection>,
{
    let Some(requested) = AttemptId::parse(attempt) else {
        debug!("malformed attempt id");
        return Ok(closed(hx, store));
    };

    let guard = match state.attempts().acquire(requested).await {
        Ok(guard) => guard,
        Err(AttemptUnavailable::Busy) => {
            return match load_open(&store, requested).await {
                Some(flow) => render(hx, store, &flow, Some(Rejection::Busy.to_string())).await,
                None => Ok(closed(hx, store)),
            };
        }
        Err(AttemptUnavailable::Closed) => {
            if load_open(&store, requested).await.is_some() {
                store.clear_flow().await?;
            }
            return Ok(closed(hx, store));
        }
    };

    let Some(mut flow) = load_open(&store, requested).await else {
        debug!("no open flow for attempt");
        return Ok(closed(hx, store));
    };

    let record = store.record();
    let response = match intent(&mut flow) {
        Err(rejection) => {
            debug!(%rejection, step = flow.step().kind().as_str(), "intent rejected");
            render(hx, store, &flow, Some(rejection.to_string())).await?
        }
        Ok(commands) => {
            breadcrumb(&flow, "intent accepted");
            let outcome = checkout::run(state, &mut store, &mut flow, commands).await;
            // Whoever closed the attempt owns the session record now.
            if outcome == Outcome::Abandoned {
                return settle(state, hx, store, &flow, outcome).await;
            }
            settle(state, hx, store, &flow, outcome).await?
        }
    };
    record.save().await?;
    drop(guard);
    Ok(response)
}

async fn settle(
    state: &AppState,
    hx: HxRequest,
    store: SessionStore,
    flow: &OtpFlow,
    outcome: Outcome,
) -> Result<Response> {
    match outcome {
        Outcome::Settled => {
            store.save_flow(flow).await?;
            render(hx, store, flow, None).await
        }
        Outcome::Redirect(url) => {
            store.clear_flow().await?;
            state.attempts().close(flow.attempt()).await;
            Ok(handoff(hx, store, url))
        }
        // The modal is already gone; a plain post goes back to the page.
        Outcome::Abandoned if hx.0 => Ok((store, StatusCode::NO_CONTENT).into_response()),
        Outcome::Abandoned => Ok((store, Redirect::to("/")).into_response()),
    }
}

async fn render(
    hx: HxRequest,
    store: SessionStore,
    flow: &OtpFlow,
    message: Option<String>,
) -> Result<Response> {
    if hx.0 {
        let modal = ModalView::new(flow, message);
        return Ok((store, CheckoutModalTemplate { modal }).into_response());
    }
    if let Some(message) = message {
        store.set_flash(&message).await?;
    }
    Ok((store, Redirect::to("/")).into_response())
}

/// Send the browser to where the finished flow leads.
///
/// Browsers hold redirects after a form post to `form-action 'self'`, so a
/// plain post bound for another origin gets a page that navigates itself.
fn handoff(hx: HxRequest, store: SessionStore, url: String) -> Response {
    if hx.0 || url.starts_with('/') {
        return (store, redirect(hx, &url)).into_response();
    }
    (store, HandoffTemplate { url }).into_response()
}

/// Empty modal root for htmx, back to the page otherwise.
fn closed(hx: HxRequest, store: SessionStore) -> Response {
    if hx.0 {
        (store, Html("")).into_response()
    } else {
        (store, Redirect::to("/")).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Open the modal for a package.
#[instrument(skip(state, store))]
pub async fn start(
    State(state): State<AppState>,
    hx: HxRequest,
    store: SessionStore,
    Form(form): Form<StartForm>,
) -> Result<Response> {
    let package_type: PackageType = form
        .package_type
        .parse()
        .map_err(|e: PackageTypeError| AppError::BadRequest(e.to_string()))?;
    let (flow, commands) = OtpFlow::checkout(package_type, state.config().course_slug.clone());
    open(&state, hx, store, flow, commands).await
}

/// Submit the email address.
#[instrument(skip(state, store, form))]
pub async fn submit_email(
    State(state): State<AppState>,
    hx: HxRequest,
    store: SessionStore,
    Form(form): Form<EmailForm>,
) -> Result<Response> {
    dispatch(&state, hx, store, &form.attempt, |flow| flow.submit_email(&form.email)).await
}

/// Submit the six-digit code.
#[instrument(skip(state, store, form))]
pub async fn verify(
    State(state): State<AppState>,
    hx: HxRequest,
    store: SessionStore,
    Form(form): Form<OtpForm>,
) -> Result<Response> {
    dispatch(&state, hx, store, &form.attempt, |flow| flow.submit_otp(&form.otp)).await
}

#[instrument(skip(state, store, form))]
pub async fn resend(
    State(state): State<AppState>,
    hx: HxRequest,
    store: SessionStore,
    Form(form): Form<AttemptForm>,
) -> Result<Response> {
    dispatch(&state, hx, store, &form.attempt, OtpFlow::resend_otp).await
}

/// Submit name and phone for a new account.
#[instrument(skip(state, store, form))]
pub async fn submit_details(
    State(state): State<AppState>,
    hx: HxRequest,
    store: SessionStore,
    Form(form): Form<DetailsForm>,
) -> Result<Response> {
    dispatch(&state, hx, store, &form.attempt, |flow| {
        flow.submit_details(&form.name, &form.phone)
    })
    .await
}

#[instrument(skip(state, store, form))]
pub async fn back(
    State(state): State<AppState>,
    hx: HxRequest,
    store: SessionStore,
    Form(form): Form<AttemptForm>,
) -> Result<Response> {
    dispatch(&state, hx, store, &form.attempt, OtpFlow::back).await
}

#[instrument(skip(state, store, form))]
pub async fn retry(
    State(state): State<AppState>,
    hx: HxRequest,
    store: SessionStore,
    Form(form): Form<AttemptForm>,
) -> Result<Response> {
    dispatch(&state, hx, store, &form.attempt, OtpFlow::retry).await
}

/// Close the modal. Requests still in flight for it drop their results.
#[instrument(skip(state, store, form))]
pub async fn close(
    State(state): State<AppState>,
    hx: HxRequest,
    store: SessionStore,
    Form(form): Form<AttemptForm>,
) -> Result<Response> {
    if let Some(attempt) = AttemptId::parse(&form.attempt) {
        state.attempts().close(attempt).await;
        if store.load_flow().await.is_some_and(|f| f.attempt() == attempt) {
            store.clear_flow().await?;
        }
    }
    Ok(closed(hx, store))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use only_choice_core::{CourseId, FlowError, FlowErrorKind};

    use super::*;

    fn slug() -> only_choice_core::CourseSlug {
        "the-only-choice".parse().unwrap()
    }

    #[test]
    fn test_badge_text() {
        assert_eq!(badge(PackageType::Regular), "Full Access \u{2014} ₹2,999");
        assert_eq!(badge(PackageType::Demo), "Pre-Enrollment \u{2014} ₹499");
    }

    #[test]
    fn test_view_before_course_lookup() {
        let (flow, _) = OtpFlow::checkout(PackageType::Demo, slug());
        let view = ModalView::new(&flow, None);
        assert_eq!(view.step, "email");
        assert!(!view.can_verify);
        assert!(view.course_note.is_none());
        assert_eq!(view.attempt, flow.attempt().to_string());
    }

    #[test]
    fn test_view_after_course_lookup_fails() {
        let (mut flow, _) = OtpFlow::checkout(PackageType::Regular, slug());
        flow.course_resolved(Err(FlowError::new(FlowErrorKind::CourseResolution, "Course not found")));
        let view = ModalView::new(&flow, None);
        assert!(!view.can_verify);
        assert_eq!(view.course_note.as_deref(), Some("Course not found"));
    }

    #[test]
    fn test_rejection_message_wins_over_notice() {
        let (mut flow, _) = OtpFlow::checkout(PackageType::Regular, slug());
        flow.course_resolved(Ok(CourseId::new(1)));
        flow.submit_email("a@b.com").unwrap();
        flow.otp_sent(Err(FlowError::new(FlowErrorKind::OtpSend, "Invalid email")));

        assert_eq!(ModalView::new(&flow, None).error.as_deref(), Some("Invalid email"));
        let view = ModalView::new(&flow, Some("Please wait".into()));
        assert_eq!(view.error.as_deref(), Some("Please wait"));
        assert!(view.course_note.is_none());
    }

    #[test]
    fn test_login_view_has_no_badge() {
        let view = ModalView::new(&OtpFlow::login(), None);
        assert!(view.badge.is_none());
        assert!(view.can_verify);
    }
}
