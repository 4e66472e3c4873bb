//! Identity API client.
//!
//! Wraps the `LectureHead` user service: OTP send/verify, profile, course
//! lookup and payment-link generation. Each call is a single request with no
//! retry; timeouts are left to the transport.

pub mod types;

use std::sync::Arc;
use std::time::Duration;

use only_choice_core::{
    CourseId, CourseSlug, Email, FlowError, FlowErrorKind, OtpLogin, OtpSent, PaymentLinkRequest,
    SessionToken, UserProfile, VerifyOtpRequest,
};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::IdentityApiConfig;
use types::{
    CourseData, Envelope, LoginBody, LoginData, PaymentLinkBody, PaymentLinkData, SendOtpBody,
    SendOtpData, api_error_message,
};

const API_KEY_HEADER: &str = "x-api-key";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Errors that can occur when talking to the identity API.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// A successful response lacked a required field.
    #[error("{0}")]
    Incomplete(&'static str),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl IdentityError {
    /// Convert into the message shown in the modal.
    ///
    /// Server messages and missing-field messages are shown as-is; transport
    /// and decoding details are replaced by the operation's fallback.
    #[must_use]
    pub fn into_flow_error(self, kind: FlowErrorKind) -> FlowError {
        match self {
            Self::Api { message, .. } => FlowError::new(kind, message),
            Self::Incomplete(message) => FlowError::new(kind, message),
            Self::Http(_) | Self::Parse(_) => FlowError::fallback(kind),
        }
    }

    /// Whether the server rejected the bearer token.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401 | 403, .. })
    }
}

/// Client for the identity API.
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<IdentityClientInner>,
}

struct IdentityClientInner {
    client: reqwest::Client,
    config: IdentityApiConfig,
}

impl IdentityClient {
    /// Create a new identity API client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &IdentityApiConfig) -> Result<Self, IdentityError> {
        let mut headers = HeaderMap::new();

        let mut api_key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|e| IdentityError::Parse(format!("Invalid API key format: {e}")))?;
        api_key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, api_key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(IdentityClientInner {
                client,
                config: config.clone(),
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        self.inner.config.endpoint(path)
    }

    fn bearer(token: &SessionToken) -> Result<HeaderValue, IdentityError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
            .map_err(|e| IdentityError::Parse(format!("Invalid token format: {e}")))?;
        value.set_sensitive(true);
        Ok(value)
    }

    /// Send a request and decode the `{data}` envelope.
    async fn send<T: DeserializeOwned>(
        request: reqwest::RequestBuilder,
        fallback: &str,
    ) -> Result<Option<T>, IdentityError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(IdentityError::Api {
                status: status.as_u16(),
                message: api_error_message(&body, fallback),
            });
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|e| IdentityError::Parse(e.to_string()))?;
        Ok(envelope.data)
    }

    /// Request an OTP email. `POST /user/otp/send`
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Api` with the server's message on rejection.
    #[instrument(skip(self, email), fields(email_domain = %email.domain()))]
    pub async fn send_otp(&self, email: &Email) -> Result<OtpSent, IdentityError> {
        let request = self
            .inner
            .client
            .post(self.url("user/otp/send"))
            .json(&SendOtpBody {
                email: email.as_str(),
            });
        let data: Option<SendOtpData> =
            Self::send(request, FlowErrorKind::OtpSend.fallback_message()).await?;

        // Only an explicit `false` marks a new account.
        let is_new_user = data.and_then(|d| d.is_existing_user) == Some(false);
        debug!(is_new_user, "OTP sent");
        Ok(OtpSent { is_new_user })
    }

    /// Exchange email + OTP (and new-user details) for a session token.
    /// `POST /user/otp/login`
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Api` on rejection and
    /// `IdentityError::Incomplete` when no token comes back.
    #[instrument(skip(self, request), fields(new_user = request.details.is_some()))]
    pub async fn verify_otp(&self, request: &VerifyOtpRequest) -> Result<OtpLogin, IdentityError> {
        let body = LoginBody {
            email: request.email.as_str(),
            otp: request.otp.as_str(),
            name: request.details.as_ref().map(|d| d.name.as_str()),
            phone_number: request.details.as_ref().map(|d| d.phone.as_str()),
        };
        let http = self.inner.client.post(self.url("user/otp/login")).json(&body);
        let data: Option<LoginData> =
            Self::send(http, FlowErrorKind::OtpVerify.fallback_message()).await?;
        let data = data.ok_or(IdentityError::Incomplete("No session token returned"))?;

        let token = data
            .token
            .and_then(|t| SessionToken::new(t).ok())
            .ok_or(IdentityError::Incomplete("No session token returned"))?;

        Ok(OtpLogin {
            token,
            is_new_user: data.is_new_user.unwrap_or(false),
        })
    }

    /// Load the profile for a session token. `GET /user/my-profile`
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Api` when the token is rejected.
    #[instrument(skip_all)]
    pub async fn fetch_profile(&self, token: &SessionToken) -> Result<UserProfile, IdentityError> {
        let request = self
            .inner
            .client
            .get(self.url("user/my-profile"))
            .header(AUTHORIZATION, Self::bearer(token)?);
        let data: Option<UserProfile> =
            Self::send(request, FlowErrorKind::ProfileFetch.fallback_message()).await?;
        data.ok_or(IdentityError::Incomplete("Failed to load profile"))
    }

    /// Look up a course's numeric id. `GET /courses/details/{slug}`
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Incomplete` if the id is missing or not a
    /// positive integer.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn fetch_course_id(&self, slug: &CourseSlug) -> Result<CourseId, IdentityError> {
        let path = format!("courses/details/{}", urlencoding::encode(slug.as_str()));
        let request = self.inner.client.get(self.url(&path));
        let data: Option<CourseData> =
            Self::send(request, FlowErrorKind::CourseResolution.fallback_message()).await?;

        data.as_ref()
            .and_then(CourseData::numeric_id)
            .map(CourseId::new)
            .ok_or(IdentityError::Incomplete("Course not found"))
    }

    /// Create a payment link and return its redirect URL. `POST /payment-link`
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Api` on rejection and
    /// `IdentityError::Incomplete` when no redirect URL comes back.
    #[instrument(skip(self, request), fields(course_id = %request.course_id, package = %request.package_type))]
    pub async fn request_payment_link(
        &self,
        request: &PaymentLinkRequest,
    ) -> Result<String, IdentityError> {
        let body = PaymentLinkBody {
            token: request.token.expose(),
            course_id: request.course_id.as_i64(),
            package_type: request.package_type.as_str(),
        };
        let http = self
            .inner
            .client
            .post(self.url("payment-link"))
            .header(AUTHORIZATION, Self::bearer(&request.token)?)
            .json(&body);
        let data: Option<PaymentLinkData> =
            Self::send(http, FlowErrorKind::PaymentLink.fallback_message()).await?;

        let link = data.and_then(|d| d.data);
        if let Some(package_id) = link.as_ref().and_then(|l| l.package_id.as_ref()) {
            debug!(%package_id, "payment link created");
        }
        link.and_then(|l| l.redirect_url)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .ok_or(IdentityError::Incomplete("No redirect URL returned"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use only_choice_core::{NewUserDetails, OtpCode, PackageType, UserId};
    use secrecy::SecretString;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const API_KEY: &str = "k3Y9xQz7LmN2pR5tVb8W";

    fn client(server: &MockServer) -> IdentityClient {
        IdentityClient::new(&IdentityApiConfig {
            base_url: format!("{}/v0", server.uri()).parse().unwrap(),
            api_key: SecretString::from(API_KEY),
        })
        .unwrap()
    }

    fn email() -> Email {
        Email::parse("a@b.com").unwrap()
    }

    fn token() -> SessionToken {
        SessionToken::new("tok1").unwrap()
    }

    #[tokio::test]
    async fn test_send_otp_existing_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v0/user/otp/send"))
            .and(header("x-api-key", API_KEY))
            .and(body_json(serde_json::json!({"email": "a@b.com"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": {"isExistingUser": true}})),
            )
            .mount(&server)
            .await;

        let sent = client(&server).send_otp(&email()).await.unwrap();
        assert!(!sent.is_new_user);
    }

    #[tokio::test]
    async fn test_send_otp_only_explicit_false_is_new() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v0/user/otp/send"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": {}})))
            .mount(&server)
            .await;
        assert!(!client(&server).send_otp(&email()).await.unwrap().is_new_user);

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v0/user/otp/send"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": {"isExistingUser": false}})),
            )
            .mount(&server)
            .await;
        assert!(client(&server).send_otp(&email()).await.unwrap().is_new_user);
    }

    #[tokio::test]
    async fn test_send_otp_failure_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v0/user/otp/send"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"errors": ["Invalid email"]})),
            )
            .mount(&server)
            .await;

        let err = client(&server).send_otp(&email()).await.unwrap_err();
        assert!(matches!(err, IdentityError::Api { status: 400, .. }));
        let flow_err = err.into_flow_error(FlowErrorKind::OtpSend);
        assert_eq!(flow_err.message, "Invalid email");
    }

    #[tokio::test]
    async fn test_verify_otp_sends_new_user_details() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v0/user/otp/login"))
            .and(body_json(serde_json::json!({
                "email": "a@b.com",
                "otp": "123456",
                "name": "Jane",
                "phoneNumber": "9999999999"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"data": {"token": "tok1", "isNewUser": true}})),
            )
            .mount(&server)
            .await;

        let login = client(&server)
            .verify_otp(&VerifyOtpRequest {
                email: email(),
                otp: OtpCode::parse("123456").unwrap(),
                details: Some(NewUserDetails::parse("Jane", "9999999999").unwrap()),
            })
            .await
            .unwrap();
        assert_eq!(login.token.expose(), "tok1");
        assert!(login.is_new_user);
    }

    #[tokio::test]
    async fn test_verify_otp_without_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v0/user/otp/login"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": {"token": ""}})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .verify_otp(&VerifyOtpRequest {
                email: email(),
                otp: OtpCode::parse("123456").unwrap(),
                details: None,
            })
            .await
            .unwrap_err();
        assert_eq!(
            err.into_flow_error(FlowErrorKind::OtpVerify).message,
            "No session token returned"
        );
    }

    #[tokio::test]
    async fn test_fetch_profile_uses_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v0/user/my-profile"))
            .and(header("Authorization", "Bearer tok1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"id": 5, "name": "Jane Doe", "firstName": "Jane", "email": "a@b.com"}
            })))
            .mount(&server)
            .await;

        let profile = client(&server).fetch_profile(&token()).await.unwrap();
        assert_eq!(profile.id, UserId::new(5));
        assert_eq!(profile.display_name(), "Jane");
    }

    #[tokio::test]
    async fn test_fetch_profile_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v0/user/my-profile"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(serde_json::json!({"message": "jwt expired"})),
            )
            .mount(&server)
            .await;

        let err = client(&server).fetch_profile(&token()).await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_fetch_course_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v0/courses/details/the-only-choice"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": {"id": 42}})),
            )
            .mount(&server)
            .await;

        let slug = CourseSlug::parse("the-only-choice").unwrap();
        assert_eq!(
            client(&server).fetch_course_id(&slug).await.unwrap(),
            CourseId::new(42)
        );
    }

    #[tokio::test]
    async fn test_fetch_course_id_not_numeric() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v0/courses/details/the-only-choice"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": {"id": "n/a"}})),
            )
            .mount(&server)
            .await;

        let slug = CourseSlug::parse("the-only-choice").unwrap();
        let err = client(&server).fetch_course_id(&slug).await.unwrap_err();
        assert_eq!(
            err.into_flow_error(FlowErrorKind::CourseResolution).message,
            "Course not found"
        );
    }

    #[tokio::test]
    async fn test_payment_link_echoes_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v0/payment-link"))
            .and(header("Authorization", "Bearer tok1"))
            .and(body_json(serde_json::json!({
                "token": "tok1",
                "courseId": 42,
                "packageType": "Regular"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"data": {"redirectUrl": "https://pay/x", "packageId": 3}}
            })))
            .mount(&server)
            .await;

        let url = client(&server)
            .request_payment_link(&PaymentLinkRequest {
                token: token(),
                course_id: CourseId::new(42),
                package_type: PackageType::Regular,
            })
            .await
            .unwrap();
        assert_eq!(url, "https://pay/x");
    }

    #[tokio::test]
    async fn test_payment_link_single_envelope_is_missing_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v0/payment-link"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"redirectUrl": "https://pay/x"}
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .request_payment_link(&PaymentLinkRequest {
                token: token(),
                course_id: CourseId::new(42),
                package_type: PackageType::Demo,
            })
            .await
            .unwrap_err();
        assert_eq!(
            err.into_flow_error(FlowErrorKind::PaymentLink).message,
            "No redirect URL returned"
        );
    }

    #[tokio::test]
    async fn test_transport_failure_uses_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v0/payment-link"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server)
            .request_payment_link(&PaymentLinkRequest {
                token: token(),
                course_id: CourseId::new(42),
                package_type: PackageType::Demo,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Parse(_)));
        assert_eq!(
            err.into_flow_error(FlowErrorKind::PaymentLink).message,
            "Failed to generate payment link"
        );
    }
}
