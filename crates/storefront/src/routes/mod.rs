//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Landing page (renders an open modal from the session)
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check
//!
//! # Checkout modal (rate limited)
//! POST /checkout/start         - Open the modal for a package
//! POST /otp/email              - Submit email, send OTP
//! POST /otp/verify             - Submit OTP
//! POST /otp/resend             - Resend OTP
//! POST /otp/details            - Submit name and phone (new users)
//! POST /otp/back               - Back to the email step
//! POST /otp/retry              - Retry from the error step
//! POST /otp/close              - Close the modal
//!
//! # Auth
//! POST /auth/login             - Open the modal in login mode (rate limited)
//! POST /auth/logout            - Forget the login cookie and profile
//! ```
//!
//! Every modal route answers htmx with the re-rendered modal fragment and
//! plain form posts with a redirect back to `/`.

pub mod auth;
pub mod checkout;
pub mod home;

use axum::{
    Router,
    http::Uri,
    routing::{get, post},
};

use crate::error::AppError;
use crate::middleware::checkout_rate_limiter;
use crate::state::AppState;

/// Create the OTP modal routes router.
pub fn otp_routes() -> Router<AppState> {
    Router::new()
        .route("/email", post(checkout::submit_email))
        .route("/verify", post(checkout::verify))
        .route("/resend", post(checkout::resend))
        .route("/details", post(checkout::submit_details))
        .route("/back", post(checkout::back))
        .route("/retry", post(checkout::retry))
        .route("/close", post(checkout::close))
}

/// Routes that call the identity API on the visitor's behalf.
fn limited_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout/start", post(checkout::start))
        .route("/auth/login", post(auth::login))
        .nest("/otp", otp_routes())
        .layer(checkout_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/auth/logout", post(auth::logout))
        .merge(limited_routes())
        .fallback(not_found)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_owned())
}
