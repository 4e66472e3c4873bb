//! Request ID middleware for request tracing and correlation.
//!
//! An upstream `x-request-id` (Cloudflare, Fly.io proxy) is reused when it is
//! short printable ASCII; anything else is replaced with a fresh UUID v4. The
//! id is recorded on the request span, tagged on the Sentry scope and echoed
//! in the response.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_UPSTREAM_ID_LEN: usize = 128;

/// Middleware that ensures every request has a unique request ID.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(upstream_id)
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    Span::current().record("request_id", &request_id);
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

fn upstream_id(raw: &str) -> Option<&str> {
    let id = raw.trim();
    let usable = !id.is_empty()
        && id.len() <= MAX_UPSTREAM_ID_LEN
        && id.bytes().all(|b| b.is_ascii_graphic());
    usable.then_some(id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, body::Body, http::Request, middleware, routing::get};
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn(request_id_middleware))
    }

    async fn response_id(request: Request<Body>) -> String {
        let response = app().oneshot(request).await.unwrap();
        response
            .headers()
            .get(REQUEST_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_upstream_id_is_echoed() {
        let request = Request::builder()
            .uri("/")
            .header(REQUEST_ID_HEADER, "cf-abc-123")
            .body(Body::empty())
            .unwrap();
        assert_eq!(response_id(request).await, "cf-abc-123");
    }

    #[tokio::test]
    async fn test_generates_uuid_when_missing_or_unusable() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert!(Uuid::parse_str(&response_id(request).await).is_ok());

        let request = Request::builder()
            .uri("/")
            .header(REQUEST_ID_HEADER, "x".repeat(500))
            .body(Body::empty())
            .unwrap();
        assert!(Uuid::parse_str(&response_id(request).await).is_ok());
    }

    #[test]
    fn test_upstream_id_rules() {
        assert_eq!(upstream_id(" abc "), Some("abc"));
        assert_eq!(upstream_id(""), None);
        assert_eq!(upstream_id("has space"), None);
    }
}
