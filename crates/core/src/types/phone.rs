//! New-user details collected before OTP verification.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Why the name/phone step was rejected.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailsError {
    #[error("Please enter your name.")]
    MissingName,
    #[error("Please enter a valid phone number (at least {min} digits).")]
    ShortPhone { min: usize },
}

/// A phone number reduced to its digits.
///
/// Formatting characters (`+`, spaces, dashes, parentheses) are dropped and at
/// most fifteen digits are kept, matching what the signup form accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub const MIN_DIGITS: usize = 10;
    pub const MAX_DIGITS: usize = 15;

    /// Parse a phone number from form input.
    ///
    /// # Errors
    ///
    /// Returns [`DetailsError::ShortPhone`] with fewer than ten digits.
    pub fn parse(input: &str) -> Result<Self, DetailsError> {
        let digits: String = input
            .chars()
            .filter(char::is_ascii_digit)
            .take(Self::MAX_DIGITS)
            .collect();
        if digits.len() < Self::MIN_DIGITS {
            return Err(DetailsError::ShortPhone {
                min: Self::MIN_DIGITS,
            });
        }
        Ok(Self(digits))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name and phone for an account that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUserDetails {
    pub name: String,
    pub phone: PhoneNumber,
}

impl NewUserDetails {
    /// Validate the name/phone form.
    ///
    /// # Errors
    ///
    /// Returns [`DetailsError::MissingName`] for a blank name, otherwise any
    /// phone validation error.
    pub fn parse(name: &str, phone: &str) -> Result<Self, DetailsError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DetailsError::MissingName);
        }
        Ok(Self {
            name: name.to_owned(),
            phone: PhoneNumber::parse(phone)?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_strips_formatting() {
        let phone = PhoneNumber::parse("+91 (999) 999-9999").unwrap();
        assert_eq!(phone.as_str(), "919999999999");
    }

    #[test]
    fn test_phone_needs_ten_digits() {
        assert!(PhoneNumber::parse("9999999999").is_ok());
        assert_eq!(
            PhoneNumber::parse("999-999-999"),
            Err(DetailsError::ShortPhone { min: 10 })
        );
    }

    #[test]
    fn test_phone_is_capped() {
        let phone = PhoneNumber::parse("12345678901234567890").unwrap();
        assert_eq!(phone.as_str().len(), PhoneNumber::MAX_DIGITS);
    }

    #[test]
    fn test_details_require_name() {
        assert_eq!(
            NewUserDetails::parse("   ", "9999999999"),
            Err(DetailsError::MissingName)
        );
        let details = NewUserDetails::parse(" Jane ", "9999999999").unwrap();
        assert_eq!(details.name, "Jane");
    }
}
