//! The Only Choice Core - Shared types and the enrollment state machine.
//!
//! This crate provides the domain types and the OTP flow used by the
//! storefront:
//! - `storefront` - Landing page, OTP modal and payment hand-off
//! - `integration-tests` - End-to-end flow tests
//!
//! # Architecture
//!
//! The core crate contains only types and pure state transitions - no I/O,
//! no HTTP clients, no async. The storefront executes the [`Command`]s that
//! the flow emits and feeds the results back in.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for emails, OTP codes, ids, prices and profiles
//! - [`checkout`] - The OTP-gated checkout/login state machine

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod checkout;
pub mod types;

pub use checkout::{
    AttemptId, Command, CourseStatus, FlowError, FlowErrorKind, FlowMode, OtpFlow, OtpLogin,
    OtpSent, PaymentLinkRequest, Pending, Rejection, Step, StepKind, VerifyOtpRequest,
};
pub use types::*;
