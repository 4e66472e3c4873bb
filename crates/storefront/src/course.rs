//! Course slug to id resolution.
//!
//! Successful lookups are cached using `moka` (10-minute TTL). Failures are
//! never cached, so the next checkout retries the lookup.

use std::time::Duration;

use moka::future::Cache;
use only_choice_core::{CourseId, CourseSlug, FlowError, FlowErrorKind};
use tracing::{instrument, warn};

use crate::identity::IdentityClient;

const CACHE_TTL: Duration = Duration::from_secs(600);

/// Resolves course slugs through the identity API.
#[derive(Clone)]
pub struct CourseResolver {
    client: IdentityClient,
    cache: Cache<CourseSlug, CourseId>,
}

impl CourseResolver {
    #[must_use]
    pub fn new(client: IdentityClient) -> Self {
        let cache = Cache::builder()
            .max_capacity(64)
            .time_to_live(CACHE_TTL)
            .build();
        Self { client, cache }
    }

    /// Resolve `slug` to its numeric id.
    ///
    /// # Errors
    ///
    /// Returns a `CourseResolution` [`FlowError`] if the lookup fails or the
    /// response carries no usable id.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn resolve(&self, slug: &CourseSlug) -> Result<CourseId, FlowError> {
        if let Some(id) = self.cache.get(slug).await {
            return Ok(id);
        }

        match self.client.fetch_course_id(slug).await {
            Ok(id) => {
                self.cache.insert(slug.clone(), id).await;
                Ok(id)
            }
            Err(e) => {
                warn!(error = %e, "course lookup failed");
                Err(e.into_flow_error(FlowErrorKind::CourseResolution))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::IdentityApiConfig;

    fn resolver(server: &MockServer) -> CourseResolver {
        let client = IdentityClient::new(&IdentityApiConfig {
            base_url: server.uri().parse().unwrap(),
            api_key: SecretString::from("k3Y9xQz7LmN2pR5tVb8W"),
        })
        .unwrap();
        CourseResolver::new(client)
    }

    #[tokio::test]
    async fn test_success_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/courses/details/the-only-choice"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": {"id": 42}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let resolver = resolver(&server);
        let slug = CourseSlug::parse("the-only-choice").unwrap();
        assert_eq!(resolver.resolve(&slug).await.unwrap(), CourseId::new(42));
        assert_eq!(resolver.resolve(&slug).await.unwrap(), CourseId::new(42));
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/courses/details/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({})))
            .expect(2)
            .mount(&server)
            .await;

        let resolver = resolver(&server);
        let slug = CourseSlug::parse("missing").unwrap();
        for _ in 0..2 {
            let err = resolver.resolve(&slug).await.unwrap_err();
            assert_eq!(err.kind, FlowErrorKind::CourseResolution);
            assert_eq!(err.message, "Course not found");
        }
    }
}
