//! Login credential and per-visitor state.
//!
//! The credential is the `consumerAuthToken` cookie shared with the course
//! platform on the parent domain. The profile cache and the open OTP flow live
//! in the tower-sessions record.
//!
//! Cookie writes are queued on the extractor and emitted as `Set-Cookie`
//! headers when it is returned as part of the response.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::FromRequestParts,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{COOKIE, SET_COOKIE},
        request::Parts,
    },
    response::{IntoResponseParts, ResponseParts},
};
use only_choice_core::{OtpFlow, SessionToken, UserProfile};
use serde::de::DeserializeOwned;
use tower_sessions::{
    Session,
    cookie::{Cookie, SameSite, time},
    session::Error as SessionError,
};
use tracing::warn;

use crate::state::AppState;

/// Name of the login cookie read by the course platform.
pub const AUTH_COOKIE_NAME: &str = "consumerAuthToken";

/// Session keys.
pub mod keys {
    pub const USER_PROFILE: &str = "user_profile";
    pub const OTP_FLOW: &str = "otp_flow";
    pub const FLASH: &str = "flash";
}

/// Credential cookie plus session-backed caches for one request.
pub struct SessionStore {
    session: Session,
    token: Option<SessionToken>,
    domain: Option<String>,
    pending: Vec<Cookie<'static>>,
}

impl SessionStore {
    /// Build a store from the request cookies.
    #[must_use]
    pub fn new(session: Session, headers: &HeaderMap, domain: Option<String>) -> Self {
        Self {
            session,
            token: read_token(headers),
            domain,
            pending: Vec::new(),
        }
    }

    // ---- credential ----

    /// The login token, if the cookie is present and non-empty.
    #[must_use]
    pub const fn token(&self) -> Option<&SessionToken> {
        self.token.as_ref()
    }

    /// Write the login cookie. `None` makes it a browser-session cookie.
    pub fn set_token(&mut self, token: &SessionToken, ttl: Option<Duration>) {
        let mut cookie = self.base_cookie(token.expose().to_owned()).build();
        if let Some(ttl) = ttl {
            let seconds = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
            cookie.set_max_age(time::Duration::seconds(seconds));
        }
        self.pending.push(cookie);
        self.token = Some(token.clone());
    }

    /// Expire the login cookie.
    pub fn clear_token(&mut self) {
        let mut cookie = self.base_cookie(String::new()).build();
        cookie.make_removal();
        self.pending.push(cookie);
        self.token = None;
    }

    fn base_cookie(&self, value: String) -> tower_sessions::cookie::CookieBuilder<'static> {
        let builder = Cookie::build((AUTH_COOKIE_NAME, value))
            .path("/")
            .secure(true)
            .same_site(SameSite::Lax)
            .http_only(false);
        match &self.domain {
            Some(domain) => builder.domain(domain.clone()),
            None => builder,
        }
    }

    // ---- session record ----

    /// Handle on the session record behind this store.
    ///
    /// Lets a handler write the record with [`Session::save`] before the
    /// response leaves, while the store itself is consumed by the response.
    #[must_use]
    pub fn record(&self) -> Session {
        self.session.clone()
    }

    // ---- profile cache ----

    /// Remember the profile for display on later pages.
    ///
    /// # Errors
    ///
    /// Returns an error if the session record cannot be written.
    pub async fn cache_profile(&self, profile: &UserProfile) -> Result<(), SessionError> {
        self.session.insert(keys::USER_PROFILE, profile).await
    }

    /// The cached profile. A corrupt entry is purged and reported absent.
    pub async fn cached_profile(&self) -> Option<UserProfile> {
        self.get_or_purge(keys::USER_PROFILE).await
    }

    /// Forget the cached profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the session record cannot be written.
    pub async fn clear_cached_profile(&self) -> Result<(), SessionError> {
        self.session.remove_value(keys::USER_PROFILE).await?;
        Ok(())
    }

    // ---- OTP flow ----

    /// The open OTP flow, if any.
    pub async fn load_flow(&self) -> Option<OtpFlow> {
        self.get_or_purge(keys::OTP_FLOW).await
    }

    /// # Errors
    ///
    /// Returns an error if the session record cannot be written.
    pub async fn save_flow(&self, flow: &OtpFlow) -> Result<(), SessionError> {
        self.session.insert(keys::OTP_FLOW, flow).await
    }

    /// # Errors
    ///
    /// Returns an error if the session record cannot be written.
    pub async fn clear_flow(&self) -> Result<(), SessionError> {
        self.session.remove_value(keys::OTP_FLOW).await?;
        Ok(())
    }

    // ---- flash ----

    /// Message to show once on the next full page render.
    ///
    /// # Errors
    ///
    /// Returns an error if the session record cannot be written.
    pub async fn set_flash(&self, message: &str) -> Result<(), SessionError> {
        self.session.insert(keys::FLASH, message).await
    }

    /// Take the pending flash message.
    pub async fn take_flash(&self) -> Option<String> {
        self.session
            .remove::<String>(keys::FLASH)
            .await
            .ok()
            .flatten()
    }

    async fn get_or_purge<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        match self.session.get::<T>(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "discarding unreadable session entry");
                if let Err(e) = self.session.remove_value(key).await {
                    warn!(key, error = %e, "failed to purge session entry");
                }
                None
            }
        }
    }
}

/// First non-empty `consumerAuthToken` across all `Cookie` headers.
fn read_token(headers: &HeaderMap) -> Option<SessionToken> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == AUTH_COOKIE_NAME && !cookie.value().trim().is_empty())
        .and_then(|cookie| SessionToken::new(cookie.value()).ok())
}

impl FromRequestParts<AppState> for SessionStore {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        Ok(Self::new(
            session,
            &parts.headers,
            state.config().auth_cookie.domain.clone(),
        ))
    }
}

impl IntoResponseParts for SessionStore {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        for cookie in self.pending {
            match HeaderValue::from_str(&cookie.to_string()) {
                Ok(value) => {
                    res.headers_mut().append(SET_COOKIE, value);
                }
                Err(e) => warn!(error = %e, "dropping unencodable cookie"),
            }
        }
        Ok(res)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use axum::response::IntoResponse;
    use only_choice_core::{PackageType, UserId};
    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    fn set_cookies(store: SessionStore) -> Vec<String> {
        let response = (store, ()).into_response();
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    fn profile() -> UserProfile {
        UserProfile {
            id: UserId::new(7),
            name: Some("Jane Doe".into()),
            first_name: Some("Jane".into()),
            last_name: None,
            email: Some("jane@example.com".into()),
            phone_number: None,
            image: None,
        }
    }

    #[test]
    fn test_reads_token_among_other_cookies() {
        let store = SessionStore::new(
            session(),
            &headers("theme=dark; consumerAuthToken=tok1; other=x"),
            None,
        );
        assert_eq!(store.token().unwrap().expose(), "tok1");
    }

    #[test]
    fn test_missing_or_empty_cookie_is_absent() {
        let store = SessionStore::new(session(), &HeaderMap::new(), None);
        assert!(store.token().is_none());

        let store = SessionStore::new(session(), &headers("consumerAuthToken="), None);
        assert!(store.token().is_none());

        let store = SessionStore::new(session(), &headers(";;=;"), None);
        assert!(store.token().is_none());
    }

    #[test]
    fn test_set_token_writes_shared_cookie() {
        let mut store =
            SessionStore::new(session(), &HeaderMap::new(), Some("agneljohn.in".into()));
        let token = SessionToken::new("tok1").unwrap();
        store.set_token(&token, Some(Duration::from_secs(30 * 86_400)));
        assert_eq!(store.token().unwrap().expose(), "tok1");

        let cookies = set_cookies(store);
        assert_eq!(cookies.len(), 1);
        let cookie = &cookies[0];
        assert!(cookie.starts_with("consumerAuthToken=tok1"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Domain=agneljohn.in"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=2592000"));
        assert!(!cookie.contains("HttpOnly"));
    }

    #[test]
    fn test_session_cookie_has_no_max_age() {
        let mut store = SessionStore::new(session(), &HeaderMap::new(), None);
        store.set_token(&SessionToken::new("tok1").unwrap(), None);
        let cookies = set_cookies(store);
        assert!(!cookies[0].contains("Max-Age"));
        assert!(!cookies[0].contains("Domain"));
    }

    #[test]
    fn test_clear_token_expires_cookie() {
        let mut store = SessionStore::new(session(), &headers("consumerAuthToken=tok1"), None);
        store.clear_token();
        assert!(store.token().is_none());

        let cookies = set_cookies(store);
        assert!(cookies[0].starts_with("consumerAuthToken=;"));
        assert!(cookies[0].contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_profile_cache_round_trip_and_clear() {
        let store = SessionStore::new(session(), &HeaderMap::new(), None);
        assert!(store.cached_profile().await.is_none());

        store.cache_profile(&profile()).await.unwrap();
        assert_eq!(store.cached_profile().await, Some(profile()));

        store.clear_cached_profile().await.unwrap();
        assert!(store.cached_profile().await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_profile_is_purged() {
        let session = session();
        session.insert(keys::USER_PROFILE, "not a profile").await.unwrap();
        let store = SessionStore::new(session.clone(), &HeaderMap::new(), None);

        assert!(store.cached_profile().await.is_none());
        let raw: Option<serde_json::Value> = session.get(keys::USER_PROFILE).await.unwrap();
        assert!(raw.is_none());
    }

    #[tokio::test]
    async fn test_flow_save_load_clear() {
        let store = SessionStore::new(session(), &HeaderMap::new(), None);
        let (flow, _) = OtpFlow::checkout(PackageType::Demo, "the-only-choice".parse().unwrap());

        store.save_flow(&flow).await.unwrap();
        assert_eq!(store.load_flow().await, Some(flow));

        store.clear_flow().await.unwrap();
        assert!(store.load_flow().await.is_none());
    }

    #[tokio::test]
    async fn test_flash_is_taken_once() {
        let store = SessionStore::new(session(), &HeaderMap::new(), None);
        store.set_flash("Please wait").await.unwrap();
        assert_eq!(store.take_flash().await.as_deref(), Some("Please wait"));
        assert!(store.take_flash().await.is_none());
    }
}
