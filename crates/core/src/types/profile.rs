//! The signed-in user's profile as returned by the identity service.

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Profile record from `GET /user/my-profile`.
///
/// Always fetched with a valid session token; never assembled locally.
/// Every field except `id` may be missing or null upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl UserProfile {
    /// Name for the navbar: first name, else full name, else email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        [&self.first_name, &self.name, &self.email]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or("Account")
    }

    /// Single letter for the avatar fallback.
    #[must_use]
    pub fn initial(&self) -> String {
        self.display_name()
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default()
    }
}
