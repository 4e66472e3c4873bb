//! Integration tests for The Only Choice.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p only-choice-integration-tests
//! ```
//!
//! The tests drive the full storefront router in-process with
//! `tower::ServiceExt::oneshot`; the identity API is a `wiremock` server. No
//! network listener or external service is needed.
//!
//! [`TestApp`] keeps a cookie jar between requests so the session cookie and
//! the `consumerAuthToken` cookie behave as they would in a browser.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use only_choice_storefront::{build_router, config::StorefrontConfig, state::AppState};
use tower::ServiceExt;
use wiremock::MockServer;

/// API key accepted by the configuration's entropy check.
pub const TEST_API_KEY: &str = "k3Y9xQz7LmN2pR5tVb8W";

static NEXT_CLIENT: AtomicU32 = AtomicU32::new(1);

/// One browser talking to a fresh storefront backed by a mock identity API.
pub struct TestApp {
    pub router: Router,
    pub identity: MockServer,
    client_ip: String,
    cookies: BTreeMap<String, String>,
}

/// A buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestApp {
    /// Start a mock identity API and build the router against it.
    ///
    /// # Panics
    ///
    /// Panics if the test configuration is rejected.
    pub async fn spawn() -> Self {
        let identity = MockServer::start().await;
        let vars: HashMap<String, String> = [
            ("STOREFRONT_BASE_URL", "https://theonlychoice.in".to_owned()),
            ("IDENTITY_API_BASE_URL", identity.uri()),
            ("IDENTITY_API_KEY", TEST_API_KEY.to_owned()),
            ("AUTH_COOKIE_DOMAIN", "theonlychoice.in".to_owned()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect();

        let config = StorefrontConfig::from_vars(&vars).expect("test configuration is valid");
        let state = AppState::new(config).expect("identity client builds");

        // Each app gets its own address so rate limits never leak between tests.
        let n = NEXT_CLIENT.fetch_add(1, Ordering::Relaxed);
        let client_ip = format!("10.{}.{}.{}", (n >> 16) & 0xff, (n >> 8) & 0xff, n & 0xff);

        Self {
            router: build_router(state),
            identity,
            client_ip,
            cookies: BTreeMap::new(),
        }
    }

    /// Current value of a cookie in the jar.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Put a cookie in the jar, as if set by another site on the parent domain.
    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.to_owned(), value.to_owned());
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        let request = self.request("GET", path, false).body(Body::empty());
        self.send(request).await
    }

    /// POST an urlencoded form, optionally as htmx.
    pub async fn post(&mut self, path: &str, form: &[(&str, &str)], hx: bool) -> TestResponse {
        let request = self.form_request(path, form, hx);
        self.send(request).await
    }

    /// POST the same htmx form twice at once, as a double click would.
    pub async fn post_twice(
        &mut self,
        path: &str,
        form: &[(&str, &str)],
    ) -> (TestResponse, TestResponse) {
        let first = call(self.router.clone(), self.form_request(path, form, true));
        let second = call(self.router.clone(), self.form_request(path, form, true));
        let (first, second) = tokio::join!(first, second);
        self.absorb_cookies(&first.headers);
        self.absorb_cookies(&second.headers);
        (first, second)
    }

    fn form_request(
        &self,
        path: &str,
        form: &[(&str, &str)],
        hx: bool,
    ) -> Result<Request<Body>, axum::http::Error> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form)
            .finish();
        self.request("POST", path, hx)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
    }

    /// htmx POST carrying only the attempt id.
    pub async fn intent(&mut self, path: &str, attempt: &str) -> TestResponse {
        self.post(path, &[("attempt", attempt)], true).await
    }

    fn request(&self, method: &str, path: &str, hx: bool) -> axum::http::request::Builder {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("x-forwarded-for", &self.client_ip);
        if hx {
            builder = builder.header("hx-request", "true");
        }
        if !self.cookies.is_empty() {
            let cookie = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(header::COOKIE, cookie);
        }
        builder
    }

    async fn send(&mut self, request: Result<Request<Body>, axum::http::Error>) -> TestResponse {
        let response = call(self.router.clone(), request).await;
        self.absorb_cookies(&response.headers);
        response
    }

    fn absorb_cookies(&mut self, headers: &HeaderMap) {
        for value in headers.get_all(header::SET_COOKIE) {
            let Ok(value) = value.to_str() else { continue };
            let (pair, attributes) = value.split_once(';').unwrap_or((value, ""));
            let Some((name, cookie_value)) = pair.split_once('=') else {
                continue;
            };
            let expired = attributes
                .split(';')
                .any(|attr| attr.trim().eq_ignore_ascii_case("Max-Age=0"));
            if expired || cookie_value.is_empty() {
                self.cookies.remove(name.trim());
            } else {
                self.cookies
                    .insert(name.trim().to_owned(), cookie_value.trim().to_owned());
            }
        }
    }
}

/// Drive one request through the router and buffer the response.
async fn call(router: Router, request: Result<Request<Body>, axum::http::Error>) -> TestResponse {
    let request = request.expect("request builds");
    let response = router.oneshot(request).await.expect("router is infallible");

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");

    TestResponse {
        status,
        headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    }
}

impl TestResponse {
    /// The attempt id embedded in a rendered modal.
    #[must_use]
    pub fn attempt(&self) -> Option<String> {
        let marker = r#"name="attempt" value=""#;
        let start = self.body.find(marker)? + marker.len();
        let rest = self.body.get(start..)?;
        rest.find('"')
            .and_then(|end| rest.get(..end))
            .map(str::to_owned)
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// All `Set-Cookie` values.
    #[must_use]
    pub fn set_cookies(&self) -> Vec<&str> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }
}
