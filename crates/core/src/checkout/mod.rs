//! OTP-gated checkout and login.
//!
//! [`OtpFlow`] is a pure state machine shared by every entry point on the
//! landing page. It never performs I/O: callers run the [`Command`]s it
//! returns and report the outcomes back.

mod error;
mod flow;

pub use error::{FlowError, FlowErrorKind, Rejection};
pub use flow::{
    AttemptId, Command, CourseStatus, FlowMode, OtpFlow, OtpLogin, OtpSent, PaymentLinkRequest,
    Pending, Step, StepKind, VerifyOtpRequest,
};
