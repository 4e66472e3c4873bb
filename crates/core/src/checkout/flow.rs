//! The OTP flow state machine.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{FlowError, FlowErrorKind, Rejection};
use crate::types::{
    CourseId, CourseSlug, Email, NewUserDetails, OtpCode, PackageType, SessionToken, UserProfile,
};

/// Identifies one opening of the modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(Uuid);

impl AttemptId {
    /// A fresh random attempt id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parse an id echoed back by a form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s.trim()).ok().map(Self)
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What the flow does once the OTP is verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowMode {
    /// Pricing, hero and curriculum buttons: end at the payment page.
    Checkout { package_type: PackageType },
    /// Navbar login: load the profile and return to the landing page.
    Login,
}

/// State of the slug lookup that runs alongside the email step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CourseStatus {
    NotRequired,
    Pending,
    Resolved(CourseId),
    Failed(String),
}

/// The visible step of the modal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    Email,
    Otp,
    Name,
    Loading,
    Redirecting { redirect_url: String },
    Error { message: String },
}

/// [`Step`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    Email,
    Otp,
    Name,
    Loading,
    Redirecting,
    Error,
}

impl Step {
    #[must_use]
    pub const fn kind(&self) -> StepKind {
        match self {
            Self::Email => StepKind::Email,
            Self::Otp => StepKind::Otp,
            Self::Name => StepKind::Name,
            Self::Loading => StepKind::Loading,
            Self::Redirecting { .. } => StepKind::Redirecting,
            Self::Error { .. } => StepKind::Error,
        }
    }
}

impl StepKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Otp => "otp",
            Self::Name => "name",
            Self::Loading => "loading",
            Self::Redirecting => "redirecting",
            Self::Error => "error",
        }
    }
}

/// The request the flow is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pending {
    SendOtp,
    ResendOtp,
    VerifyOtp,
    PaymentLink,
    Profile,
}

/// Successful `POST /user/otp/send`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpSent {
    pub is_new_user: bool,
}

/// Successful `POST /user/otp/login`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpLogin {
    pub token: SessionToken,
    pub is_new_user: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: Email,
    pub otp: OtpCode,
    pub details: Option<NewUserDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLinkRequest {
    pub token: SessionToken,
    pub course_id: CourseId,
    pub package_type: PackageType,
}

/// Side effects requested by the flow, executed in order by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ResolveCourse(CourseSlug),
    SendOtp(Email),
    VerifyOtp(VerifyOtpRequest),
    PersistCredential(SessionToken),
    RequestPaymentLink(PaymentLinkRequest),
    FetchProfile(SessionToken),
    CacheProfile(UserProfile),
    ClearSession,
    Redirect(String),
}

/// One checkout or login attempt.
///
/// Intents (`submit_*`, `resend_otp`, `back`, `retry`) either reject without
/// touching state or return the commands to run. Each command's outcome is
/// fed back through the matching result handler. A result that does not
/// match the request currently in flight is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpFlow {
    attempt: AttemptId,
    mode: FlowMode,
    step: Step,
    course: CourseStatus,
    email: Option<Email>,
    otp: Option<OtpCode>,
    is_new_user: bool,
    details: Option<NewUserDetails>,
    in_flight: Option<Pending>,
    notice: Option<String>,
}

impl OtpFlow {
    fn new(mode: FlowMode, course: CourseStatus) -> Self {
        Self {
            attempt: AttemptId::new(),
            mode,
            step: Step::Email,
            course,
            email: None,
            otp: None,
            is_new_user: false,
            details: None,
            in_flight: None,
            notice: None,
        }
    }

    /// Start a checkout for `package_type`; the course lookup starts at once.
    #[must_use]
    pub fn checkout(package_type: PackageType, slug: CourseSlug) -> (Self, Vec<Command>) {
        let flow = Self::new(FlowMode::Checkout { package_type }, CourseStatus::Pending);
        (flow, vec![Command::ResolveCourse(slug)])
    }

    /// Start a navbar login.
    #[must_use]
    pub fn login() -> Self {
        Self::new(FlowMode::Login, CourseStatus::NotRequired)
    }

    #[must_use]
    pub const fn attempt(&self) -> AttemptId {
        self.attempt
    }

    #[must_use]
    pub const fn mode(&self) -> FlowMode {
        self.mode
    }

    #[must_use]
    pub const fn step(&self) -> &Step {
        &self.step
    }

    #[must_use]
    pub const fn course(&self) -> &CourseStatus {
        &self.course
    }

    #[must_use]
    pub const fn email(&self) -> Option<&Email> {
        self.email.as_ref()
    }

    #[must_use]
    pub const fn is_new_user(&self) -> bool {
        self.is_new_user
    }

    #[must_use]
    pub const fn details(&self) -> Option<&NewUserDetails> {
        self.details.as_ref()
    }

    #[must_use]
    pub const fn in_flight(&self) -> Option<Pending> {
        self.in_flight
    }

    /// Inline error for the current step.
    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        matches!(self.step, Step::Redirecting { .. })
    }

    /// Whether the verify action may be offered: nothing in flight and, for
    /// checkouts, the course id known.
    #[must_use]
    pub const fn can_verify(&self) -> bool {
        self.in_flight.is_none() && self.course_ready()
    }

    const fn course_ready(&self) -> bool {
        match self.mode {
            FlowMode::Login => true,
            FlowMode::Checkout { .. } => matches!(self.course, CourseStatus::Resolved(_)),
        }
    }

    fn guard(&self, expected: StepKind) -> Result<(), Rejection> {
        if self.is_finished() {
            return Err(Rejection::Finished);
        }
        if self.in_flight.is_some() {
            return Err(Rejection::Busy);
        }
        if self.step.kind() != expected {
            return Err(Rejection::WrongStep);
        }
        Ok(())
    }

    // ---- intents ----

    /// Submit the email form.
    ///
    /// # Errors
    ///
    /// Rejects outside the email step, while busy, or for an invalid address.
    pub fn submit_email(&mut self, input: &str) -> Result<Vec<Command>, Rejection> {
        self.guard(StepKind::Email)?;
        let email = Email::parse(input)?;

        self.email = Some(email.clone());
        self.notice = None;
        self.in_flight = Some(Pending::SendOtp);
        Ok(vec![Command::SendOtp(email)])
    }

    /// Ask for a fresh code. Only offered on the OTP step.
    ///
    /// # Errors
    ///
    /// Rejects outside the OTP step or while busy.
    pub fn resend_otp(&mut self) -> Result<Vec<Command>, Rejection> {
        self.guard(StepKind::Otp)?;
        let email = self.email.clone().ok_or(Rejection::WrongStep)?;

        self.notice = None;
        self.in_flight = Some(Pending::ResendOtp);
        Ok(vec![Command::SendOtp(email)])
    }

    /// Submit the six-digit code.
    ///
    /// New users without name and phone are moved to the name step instead
    /// of verifying.
    ///
    /// # Errors
    ///
    /// Rejects outside the OTP step, while busy, for a malformed code, or
    /// while a checkout's course id is unknown.
    pub fn submit_otp(&mut self, input: &str) -> Result<Vec<Command>, Rejection> {
        self.guard(StepKind::Otp)?;
        let otp = OtpCode::parse(input)?;
        if !self.course_ready() {
            return Err(Rejection::CourseUnavailable);
        }
        let email = self.email.clone().ok_or(Rejection::WrongStep)?;

        self.otp = Some(otp.clone());
        self.notice = None;

        if self.is_new_user && self.details.is_none() {
            self.step = Step::Name;
            return Ok(Vec::new());
        }

        self.in_flight = Some(Pending::VerifyOtp);
        Ok(vec![Command::VerifyOtp(VerifyOtpRequest {
            email,
            otp,
            details: self.details.clone(),
        })])
    }

    /// Submit name and phone for a new account, then verify.
    ///
    /// # Errors
    ///
    /// Rejects outside the name step, while busy, for invalid details, or
    /// while a checkout's course id is unknown.
    pub fn submit_details(&mut self, name: &str, phone: &str) -> Result<Vec<Command>, Rejection> {
        self.guard(StepKind::Name)?;
        let details = NewUserDetails::parse(name, phone)?;
        if !self.course_ready() {
            return Err(Rejection::CourseUnavailable);
        }
        let (Some(email), Some(otp)) = (self.email.clone(), self.otp.clone()) else {
            return Err(Rejection::WrongStep);
        };

        self.details = Some(details.clone());
        self.notice = None;
        self.in_flight = Some(Pending::VerifyOtp);
        Ok(vec![Command::VerifyOtp(VerifyOtpRequest {
            email,
            otp,
            details: Some(details),
        })])
    }

    /// Go back one step: OTP to email, name to OTP.
    ///
    /// # Errors
    ///
    /// Rejects while busy, after redirecting, or on any other step.
    pub fn back(&mut self) -> Result<Vec<Command>, Rejection> {
        if self.is_finished() {
            return Err(Rejection::Finished);
        }
        if self.in_flight.is_some() {
            return Err(Rejection::Busy);
        }
        self.step = match self.step {
            Step::Otp => {
                self.otp = None;
                Step::Email
            }
            Step::Name => Step::Otp,
            _ => return Err(Rejection::WrongStep),
        };
        self.notice = None;
        Ok(Vec::new())
    }

    /// Start over from the error step.
    ///
    /// # Errors
    ///
    /// Rejects outside the error step.
    pub fn retry(&mut self) -> Result<Vec<Command>, Rejection> {
        self.guard(StepKind::Error)?;

        self.step = Step::Email;
        self.email = None;
        self.otp = None;
        self.details = None;
        self.is_new_user = false;
        self.notice = None;
        Ok(Vec::new())
    }

    // ---- results ----

    fn take_pending(&mut self, expected: &[Pending]) -> Option<Pending> {
        match self.in_flight {
            Some(pending) if expected.contains(&pending) => self.in_flight.take(),
            _ => None,
        }
    }

    /// Outcome of the course lookup.
    pub fn course_resolved(&mut self, result: Result<CourseId, FlowError>) -> Vec<Command> {
        if self.course != CourseStatus::Pending {
            return Vec::new();
        }
        self.course = match result {
            Ok(id) => CourseStatus::Resolved(id),
            Err(err) => CourseStatus::Failed(err.message),
        };
        Vec::new()
    }

    /// Outcome of a send or resend.
    pub fn otp_sent(&mut self, result: Result<OtpSent, FlowError>) -> Vec<Command> {
        let Some(pending) = self.take_pending(&[Pending::SendOtp, Pending::ResendOtp]) else {
            return Vec::new();
        };
        match (pending, result) {
            (Pending::SendOtp, Ok(sent)) => {
                self.is_new_user = sent.is_new_user;
                self.otp = None;
                self.details = None;
                self.step = Step::Otp;
            }
            (_, Err(err)) => self.notice = Some(err.message),
            // A resend keeps the step and everything typed so far.
            (_, Ok(_)) => {}
        }
        Vec::new()
    }

    /// Outcome of OTP verification.
    pub fn otp_verified(&mut self, result: Result<OtpLogin, FlowError>) -> Vec<Command> {
        if self.take_pending(&[Pending::VerifyOtp]).is_none() {
            return Vec::new();
        }
        let login = match result {
            Ok(login) => login,
            Err(err) => {
                self.step = Step::Otp;
                self.otp = None;
                self.notice = Some(err.message);
                return Vec::new();
            }
        };

        self.step = Step::Loading;
        let mut commands = vec![Command::PersistCredential(login.token.clone())];
        match (self.mode, &self.course) {
            (FlowMode::Login, _) => {
                self.in_flight = Some(Pending::Profile);
                commands.push(Command::FetchProfile(login.token));
            }
            (FlowMode::Checkout { package_type }, CourseStatus::Resolved(course_id)) => {
                self.in_flight = Some(Pending::PaymentLink);
                commands.push(Command::RequestPaymentLink(PaymentLinkRequest {
                    token: login.token,
                    course_id: *course_id,
                    package_type,
                }));
            }
            (FlowMode::Checkout { .. }, _) => {
                self.step = Step::Error {
                    message: FlowErrorKind::CourseResolution.fallback_message().to_owned(),
                };
            }
        }
        commands
    }

    /// Outcome of the payment-link request.
    pub fn payment_link_received(&mut self, result: Result<String, FlowError>) -> Vec<Command> {
        if self.take_pending(&[Pending::PaymentLink]).is_none() {
            return Vec::new();
        }
        match result {
            Ok(url) if !url.trim().is_empty() => {
                self.step = Step::Redirecting {
                    redirect_url: url.clone(),
                };
                vec![Command::Redirect(url)]
            }
            Ok(_) => {
                self.step = Step::Error {
                    message: "No redirect URL returned".to_owned(),
                };
                Vec::new()
            }
            Err(err) => {
                self.step = Step::Error {
                    message: err.message,
                };
                Vec::new()
            }
        }
    }

    /// Outcome of the profile fetch after a navbar login.
    pub fn profile_loaded(&mut self, result: Result<UserProfile, FlowError>) -> Vec<Command> {
        if self.take_pending(&[Pending::Profile]).is_none() {
            return Vec::new();
        }
        match result {
            Ok(profile) => {
                self.step = Step::Redirecting {
                    redirect_url: "/".to_owned(),
                };
                vec![Command::CacheProfile(profile), Command::Redirect("/".to_owned())]
            }
            Err(err) => {
                self.step = Step::Error {
                    message: err.message,
                };
                vec![Command::ClearSession]
            }
        }
    }
}
