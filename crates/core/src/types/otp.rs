//! One-time password codes.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why an OTP submission was rejected before reaching the network.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpError {
    /// Not exactly six characters.
    #[error("Enter the 6-digit code from your email.")]
    WrongLength,
    /// Six characters, but not all ASCII digits.
    #[error("The code can only contain digits.")]
    NonDigit,
}

/// A six-digit one-time password.
///
/// No trimming or digit extraction happens here: `" 123456"` and `"12345a"`
/// are both rejected.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OtpCode(String);

impl OtpCode {
    /// Number of digits in every code.
    pub const LENGTH: usize = 6;

    /// Parse a code from raw form input.
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::WrongLength`] unless the input is exactly six
    /// characters, and [`OtpError::NonDigit`] if any of them is not `0-9`.
    pub fn parse(input: &str) -> Result<Self, OtpError> {
        if input.chars().count() != Self::LENGTH {
            return Err(OtpError::WrongLength);
        }
        if !input.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OtpError::NonDigit);
        }
        Ok(Self(input.to_owned()))
    }

    /// The digits as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Codes are short-lived credentials; keep them out of logs.
impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode(******)")
    }
}

impl TryFrom<String> for OtpCode {
    type Error = OtpError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OtpCode> for String {
    fn from(code: OtpCode) -> Self {
        code.0
    }
}
