//! HTMX request detection and redirects.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{HeaderName, HeaderValue, StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};

/// Set by htmx on every request it issues.
pub const HX_REQUEST: HeaderName = HeaderName::from_static("hx-request");

/// Tells htmx to perform a full-page navigation.
pub const HX_REDIRECT: HeaderName = HeaderName::from_static("hx-redirect");

/// Whether the request came from htmx (`HX-Request: true`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HxRequest(pub bool);

impl<S> FromRequestParts<S> for HxRequest
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let is_htmx = parts
            .headers
            .get(&HX_REQUEST)
            .is_some_and(|v| v.as_bytes() == b"true");
        Ok(Self(is_htmx))
    }
}

/// Navigate the browser to `url`.
///
/// htmx requests get `200` with `HX-Redirect` so the swap is skipped and the
/// whole page changes; plain form posts get `303 See Other`.
#[must_use]
pub fn redirect(HxRequest(is_htmx): HxRequest, url: &str) -> Response {
    if !is_htmx {
        return Redirect::to(url).into_response();
    }
    match HeaderValue::from_str(url) {
        Ok(value) => (StatusCode::OK, [(HX_REDIRECT, value)]).into_response(),
        Err(_) => Redirect::to(url).into_response(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use axum::http::{Request, header::LOCATION};

    use super::*;

    async fn extract(req: Request<()>) -> HxRequest {
        let (mut parts, ()) = req.into_parts();
        HxRequest::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_detects_htmx_header() {
        let req = Request::builder().header("hx-request", "true").body(()).unwrap();
        assert_eq!(extract(req).await, HxRequest(true));

        let req = Request::builder().body(()).unwrap();
        assert_eq!(extract(req).await, HxRequest(false));
    }

    #[test]
    fn test_redirect_shapes() {
        let response = redirect(HxRequest(true), "https://pay.example/x");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[&HX_REDIRECT], "https://pay.example/x");

        let response = redirect(HxRequest(false), "https://pay.example/x");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "https://pay.example/x");
    }
}
