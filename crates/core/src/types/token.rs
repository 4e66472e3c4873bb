//! Session bearer tokens.

use core::fmt;

use serde::{Deserialize, Serialize};

/// An empty token where one is required.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("session token is empty")]
pub struct TokenError;

/// Opaque bearer credential issued after OTP verification.
///
/// `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a token string.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] if the token is empty or only whitespace.
    pub fn new(token: impl Into<String>) -> Result<Self, TokenError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(TokenError);
        }
        Ok(Self(token))
    }

    /// The raw token, for `Authorization` headers and cookies.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

impl TryFrom<String> for SessionToken {
    type Error = TokenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SessionToken> for String {
    fn from(token: SessionToken) -> Self {
        token.0
    }
}
