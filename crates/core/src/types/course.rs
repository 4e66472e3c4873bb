//! Course slugs.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Invalid course slug.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CourseSlugError {
    #[error("course slug is empty")]
    Empty,
    #[error("course slug may only contain a-z, 0-9 and '-': {0}")]
    InvalidChars(String),
}

/// Human-readable course identifier, resolved to a numeric id at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CourseSlug(String);

impl CourseSlug {
    /// Parse a slug.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty slug or one with characters outside
    /// lowercase ASCII letters, digits and `-`.
    pub fn parse(input: &str) -> Result<Self, CourseSlugError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(CourseSlugError::Empty);
        }
        if !s
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        {
            return Err(CourseSlugError::InvalidChars(s.to_owned()));
        }
        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CourseSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CourseSlug {
    type Err = CourseSlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CourseSlug {
    type Error = CourseSlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CourseSlug> for String {
    fn from(slug: CourseSlug) -> Self {
        slug.0
    }
}
