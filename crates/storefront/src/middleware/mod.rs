//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (CSP, frame, referrer)
//! 5. Session layer (tower-sessions with in-memory store)
//! 6. Rate limiting (governor, checkout and OTP routes only)
//!
//! Extractors: [`SessionStore`] (login cookie, profile cache, OTP flow) and
//! [`HxRequest`].

pub mod htmx;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;
pub mod session_store;

pub use htmx::{HxRequest, redirect};
pub use rate_limit::checkout_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
pub use session_store::{AUTH_COOKIE_NAME, SessionStore};
