//! Failures and rejections surfaced by the OTP flow.

use serde::{Deserialize, Serialize};

use crate::types::{DetailsError, EmailError, OtpError};

/// Which external exchange failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowErrorKind {
    OtpSend,
    OtpVerify,
    ProfileFetch,
    CourseResolution,
    PaymentLink,
}

impl FlowErrorKind {
    /// Message shown when the server gave nothing more specific.
    #[must_use]
    pub const fn fallback_message(self) -> &'static str {
        match self {
            Self::OtpSend => "Failed to send OTP",
            Self::OtpVerify => "OTP verification failed",
            Self::ProfileFetch => "Failed to load profile",
            Self::CourseResolution => "Course not found",
            Self::PaymentLink => "Failed to generate payment link",
        }
    }
}

/// A failed exchange with the identity service, ready for display.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct FlowError {
    pub kind: FlowErrorKind,
    pub message: String,
}

impl FlowError {
    pub fn new(kind: FlowErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// An error carrying the kind's fallback message.
    #[must_use]
    pub fn fallback(kind: FlowErrorKind) -> Self {
        Self::new(kind, kind.fallback_message())
    }
}

/// An intent refused before any request was issued.
///
/// Rejections never change the flow's state.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("Please wait for the current request to finish.")]
    Busy,
    #[error("That action is not available right now.")]
    WrongStep,
    #[error(transparent)]
    InvalidEmail(#[from] EmailError),
    #[error(transparent)]
    InvalidOtp(#[from] OtpError),
    #[error(transparent)]
    InvalidDetails(#[from] DetailsError),
    #[error("Course details are still loading. Please try again in a moment.")]
    CourseUnavailable,
    #[error("You're being redirected.")]
    Finished,
}
