//! Business logic services for storefront.
//!
//! # Services
//!
//! - `checkout` - Runs the OTP flow against the identity API and tracks open
//!   attempts
//! - `session_restore` - Works out who is viewing the page from the login
//!   cookie and the cached profile

pub mod checkout;
pub mod session_restore;
