//! Who is looking at the page.
//!
//! Runs on every full page render. A login cookie is always re-validated by
//! fetching the profile; without one, a previously cached profile is shown
//! as-is. Nothing here ever surfaces an error to the visitor.

use only_choice_core::UserProfile;
use tracing::{debug, info, instrument, warn};

use crate::error::set_sentry_user;
use crate::identity::IdentityClient;
use crate::middleware::SessionStore;

/// The visitor as far as the navbar is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    /// Profile fetched with a valid login cookie.
    Member(UserProfile),
    /// Cached profile with no cookie to check it against.
    Remembered(UserProfile),
    Anonymous,
}

impl Viewer {
    #[must_use]
    pub const fn profile(&self) -> Option<&UserProfile> {
        match self {
            Self::Member(profile) | Self::Remembered(profile) => Some(profile),
            Self::Anonymous => None,
        }
    }
}

/// Resolve the viewer, refreshing or clearing the stored session as needed.
///
/// A cookie whose profile fetch fails (expired, revoked, or the service is
/// down) is treated as invalid: the cookie and the cached profile are both
/// cleared.
#[instrument(skip_all)]
pub async fn restore(client: &IdentityClient, store: &mut SessionStore) -> Viewer {
    let Some(token) = store.token().cloned() else {
        return match store.cached_profile().await {
            Some(profile) => {
                debug!("showing cached profile");
                Viewer::Remembered(profile)
            }
            None => Viewer::Anonymous,
        };
    };

    match client.fetch_profile(&token).await {
        Ok(profile) => {
            if let Err(e) = store.cache_profile(&profile).await {
                warn!(error = %e, "failed to cache profile");
            }
            set_sentry_user(&profile.id, profile.email.as_deref());
            Viewer::Member(profile)
        }
        Err(e) => {
            if e.is_unauthorized() {
                info!("login cookie rejected, signing out");
            } else {
                warn!(error = %e, "profile fetch failed, signing out");
            }
            store.clear_token();
            if let Err(e) = store.clear_cached_profile().await {
                warn!(error = %e, "failed to clear cached profile");
            }
            Viewer::Anonymous
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::{HeaderMap, HeaderValue, header::COOKIE};
    use only_choice_core::UserId;
    use secrecy::SecretString;
    use serde_json::json;
    use tower_sessions::{MemoryStore, Session};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::IdentityApiConfig;

    fn client(server: &MockServer) -> IdentityClient {
        IdentityClient::new(&IdentityApiConfig {
            base_url: server.uri().parse().unwrap(),
            api_key: SecretString::from("k3Y9xQz7LmN2pR5tVb8W"),
        })
        .unwrap()
    }

    fn store(cookie: Option<&str>) -> SessionStore {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let mut headers = HeaderMap::new();
        if let Some(cookie) = cookie {
            headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        }
        SessionStore::new(session, &headers, None)
    }

    fn profile() -> UserProfile {
        UserProfile {
            id: UserId::new(7),
            name: Some("Jane Doe".into()),
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            email: Some("jane@example.com".into()),
            phone_number: None,
            image: None,
        }
    }

    #[tokio::test]
    async fn test_valid_cookie_becomes_member() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/my-profile"))
            .and(header("authorization", "Bearer tok1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"id": 7, "name": "Jane Doe", "firstName": "Jane",
                         "lastName": "Doe", "email": "jane@example.com"}
            })))
            .mount(&server)
            .await;

        let mut store = store(Some("consumerAuthToken=tok1"));
        let viewer = restore(&client(&server), &mut store).await;

        assert_eq!(viewer, Viewer::Member(profile()));
        assert_eq!(store.cached_profile().await, Some(profile()));
        assert!(store.token().is_some());
    }

    #[tokio::test]
    async fn test_expired_cookie_clears_everything_quietly() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/my-profile"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "jwt expired"})))
            .mount(&server)
            .await;

        let mut store = store(Some("consumerAuthToken=stale"));
        store.cache_profile(&profile()).await.unwrap();

        let viewer = restore(&client(&server), &mut store).await;

        assert_eq!(viewer, Viewer::Anonymous);
        assert!(store.token().is_none());
        assert!(store.cached_profile().await.is_none());
    }

    #[tokio::test]
    async fn test_cached_profile_shown_without_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/my-profile"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut store = store(None);
        store.cache_profile(&profile()).await.unwrap();

        let viewer = restore(&client(&server), &mut store).await;
        assert_eq!(viewer, Viewer::Remembered(profile()));
    }

    #[tokio::test]
    async fn test_nothing_stored_is_anonymous() {
        let server = MockServer::start().await;
        let mut store = store(None);
        assert_eq!(restore(&client(&server), &mut store).await, Viewer::Anonymous);
    }
}
