//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Every endpoint that reaches the identity API (opening the modal, OTP
//! send/verify/resend) shares one per-IP limiter, so a single client cannot
//! flood inboxes with codes or brute-force a code.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

// =============================================================================
// Custom IP Key Extractor for Cloudflare + Fly.io
// =============================================================================

/// Key extractor that checks Cloudflare's `CF-Connecting-IP` header first,
/// then the standard proxy headers, then the socket peer address.
#[derive(Clone, Copy)]
pub struct CloudflareIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for CloudflareIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();
        let header_ip = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        };

        // Cloudflare's real client IP, then the first hop of X-Forwarded-For,
        // then X-Real-IP and Fly.io's header.
        ["cf-connecting-ip", "x-forwarded-for", "x-real-ip", "fly-client-ip"]
            .into_iter()
            .find_map(header_ip)
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<CloudflareIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for checkout and OTP endpoints: ~30 requests per
/// minute per IP.
///
/// Configuration: 1 request every 2 seconds (replenish), burst of 10. A full
/// run through the modal takes five or six requests.
///
/// # Panics
///
/// This function will not panic. The configuration uses only valid positive
/// integers (`per_second(2)` and `burst_size(10)`), which are always accepted
/// by `GovernorConfigBuilder`.
#[must_use]
pub fn checkout_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(CloudflareIpKeyExtractor)
        .per_second(2) // Replenish 1 token every 2 seconds
        .burst_size(10)
        .finish()
        .expect("rate limiter config with per_second(2) and burst_size(10) is valid");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    fn request(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder();
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_cloudflare_header_wins() {
        let req = request(&[
            ("x-forwarded-for", "10.0.0.1"),
            ("cf-connecting-ip", "203.0.113.7"),
        ]);
        assert_eq!(CloudflareIpKeyExtractor.extract(&req).unwrap(), ip("203.0.113.7"));
    }

    #[test]
    fn test_first_forwarded_hop() {
        let req = request(&[("x-forwarded-for", "198.51.100.4, 10.0.0.1")]);
        assert_eq!(CloudflareIpKeyExtractor.extract(&req).unwrap(), ip("198.51.100.4"));
    }

    #[test]
    fn test_peer_address_fallback() {
        let mut req = request(&[("x-real-ip", "garbage")]);
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));
        assert_eq!(CloudflareIpKeyExtractor.extract(&req).unwrap(), ip("192.0.2.1"));
    }

    #[test]
    fn test_no_source_is_an_error() {
        assert!(CloudflareIpKeyExtractor.extract(&request(&[])).is_err());
    }
}
