//! Core types for The Only Choice.
//!
//! This module provides type-safe wrappers for the values that flow through
//! the enrollment funnel.

pub mod course;
pub mod email;
pub mod id;
pub mod otp;
pub mod package;
pub mod phone;
pub mod price;
pub mod profile;
pub mod token;

pub use course::{CourseSlug, CourseSlugError};
pub use email::{Email, EmailError};
pub use id::*;
pub use otp::{OtpCode, OtpError};
pub use package::{Installment, Package, PackageType, PackageTypeError};
pub use phone::{DetailsError, NewUserDetails, PhoneNumber};
pub use price::{CurrencyCode, Price};
pub use profile::UserProfile;
pub use token::{SessionToken, TokenError};
