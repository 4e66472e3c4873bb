//! Runs OTP flow commands against the identity API.
//!
//! Handlers apply an intent to the [`OtpFlow`] held in the session and hand
//! the returned commands to [`run`], which performs each one and feeds the
//! outcome back into the flow until nothing is left to do.
//!
//! Every open modal has an entry in the [`AttemptRegistry`]. A request holds
//! the attempt's lock while it runs, so a second submission for the same
//! attempt is turned away as busy. Closing the modal removes the entry; a
//! request that finds its attempt gone after an await drops the result and
//! leaves the session alone.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use only_choice_core::{AttemptId, Command, FlowError, FlowErrorKind, OtpFlow};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

use crate::error::add_breadcrumb;
use crate::identity::IdentityError;
use crate::middleware::SessionStore;
use crate::state::AppState;

/// Abandoned modals are forgotten after this long without a request.
const ATTEMPT_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Why an attempt's lock could not be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AttemptUnavailable {
    /// The modal was closed, replaced, or expired.
    #[error("attempt closed")]
    Closed,
    /// Another request for the same attempt is still running.
    #[error("attempt busy")]
    Busy,
}

/// Held for the duration of one request against an attempt.
#[derive(Debug)]
pub struct AttemptGuard {
    _lock: OwnedMutexGuard<()>,
}

/// Open checkout attempts.
#[derive(Clone)]
pub struct AttemptRegistry {
    locks: Cache<AttemptId, Arc<Mutex<()>>>,
}

impl Default for AttemptRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AttemptRegistry {
    #[must_use]
    pub fn new() -> Self {
        let locks = Cache::builder()
            .max_capacity(100_000)
            .time_to_idle(ATTEMPT_IDLE_TIMEOUT)
            .build();
        Self { locks }
    }

    /// Register a newly opened modal.
    pub async fn open(&self, attempt: AttemptId) {
        self.locks.insert(attempt, Arc::new(Mutex::new(()))).await;
    }

    /// Take the attempt's lock without waiting.
    ///
    /// # Errors
    ///
    /// [`AttemptUnavailable::Closed`] if the attempt is unknown,
    /// [`AttemptUnavailable::Busy`] if another request holds it.
    pub async fn acquire(&self, attempt: AttemptId) -> Result<AttemptGuard, AttemptUnavailable> {
        let lock = self
            .locks
            .get(&attempt)
            .await
            .ok_or(AttemptUnavailable::Closed)?;
        lock.try_lock_owned()
            .map(|guard| AttemptGuard { _lock: guard })
            .map_err(|_| AttemptUnavailable::Busy)
    }

    #[must_use]
    pub fn is_open(&self, attempt: AttemptId) -> bool {
        self.locks.contains_key(&attempt)
    }

    /// Forget the attempt. Requests still running for it drop their results.
    pub async fn close(&self, attempt: AttemptId) {
        self.locks.invalidate(&attempt).await;
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// All commands ran; render the flow's current step.
    Settled,
    /// The flow finished; send the browser here.
    Redirect(String),
    /// The attempt was closed while a request was in flight.
    Abandoned,
}

/// Record a flow transition in the Sentry trail.
pub fn breadcrumb(flow: &OtpFlow, message: &str) {
    let attempt = flow.attempt().to_string();
    add_breadcrumb(
        "checkout",
        message,
        Some(&[("attempt", &attempt), ("step", flow.step().kind().as_str())]),
    );
}

fn flow_error(kind: FlowErrorKind) -> impl FnOnce(IdentityError) -> FlowError {
    move |e| {
        warn!(error = %e, ?kind, "identity request failed");
        e.into_flow_error(kind)
    }
}

/// Execute `commands` for `flow`, feeding results back in order.
///
/// Credential writes are queued on `store`; the caller persists the flow.
#[instrument(skip_all, fields(attempt = %flow.attempt()))]
pub async fn run(
    state: &AppState,
    store: &mut SessionStore,
    flow: &mut OtpFlow,
    commands: Vec<Command>,
) -> Outcome {
    let attempt = flow.attempt();
    let live = || state.attempts().is_open(attempt);
    let mut queue: VecDeque<Command> = commands.into();
    let mut redirect = None;

    while let Some(command) = queue.pop_front() {
        let follow_up = match command {
            Command::ResolveCourse(slug) => {
                let result = state.courses().resolve(&slug).await;
                if !live() {
                    return Outcome::Abandoned;
                }
                let next = flow.course_resolved(result);
                debug!(course = ?flow.course(), "course lookup finished");
                next
            }
            Command::SendOtp(email) => {
                let result = state
                    .identity()
                    .send_otp(&email)
                    .await
                    .map_err(flow_error(FlowErrorKind::OtpSend));
                if !live() {
                    return Outcome::Abandoned;
                }
                let next = flow.otp_sent(result);
                breadcrumb(flow, "otp send finished");
                next
            }
            Command::VerifyOtp(request) => {
                let result = state
                    .identity()
                    .verify_otp(&request)
                    .await
                    .map_err(flow_error(FlowErrorKind::OtpVerify));
                if !live() {
                    return Outcome::Abandoned;
                }
                let next = flow.otp_verified(result);
                breadcrumb(flow, "otp verify finished");
                next
            }
            Command::PersistCredential(token) => {
                store.set_token(&token, state.config().auth_cookie.ttl);
                Vec::new()
            }
            Command::RequestPaymentLink(request) => {
                let result = state
                    .identity()
                    .request_payment_link(&request)
                    .await
                    .map_err(flow_error(FlowErrorKind::PaymentLink));
                if !live() {
                    return Outcome::Abandoned;
                }
                let next = flow.payment_link_received(result);
                breadcrumb(flow, "payment link finished");
                next
            }
            Command::FetchProfile(token) => {
                let result = state
                    .identity()
                    .fetch_profile(&token)
                    .await
                    .map_err(flow_error(FlowErrorKind::ProfileFetch));
                if !live() {
                    return Outcome::Abandoned;
                }
                let next = flow.profile_loaded(result);
                breadcrumb(flow, "profile fetch finished");
                next
            }
            Command::CacheProfile(profile) => {
                if let Err(e) = store.cache_profile(&profile).await {
                    warn!(error = %e, "failed to cache profile");
                }
                Vec::new()
            }
            Command::ClearSession => {
                store.clear_token();
                if let Err(e) = store.clear_cached_profile().await {
                    warn!(error = %e, "failed to clear cached profile");
                }
                Vec::new()
            }
            Command::Redirect(url) => {
                info!(mode = ?flow.mode(), "checkout flow finished");
                redirect = Some(url);
                Vec::new()
            }
        };
        queue.extend(follow_up);
    }

    redirect.map_or(Outcome::Settled, Outcome::Redirect)
}
