//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::course::CourseResolver;
use crate::identity::{IdentityClient, IdentityError};
use crate::services::checkout::AttemptRegistry;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// identity client, the course cache and the open checkout attempts.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    identity: IdentityClient,
    courses: CourseResolver,
    attempts: AttemptRegistry,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity API client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, IdentityError> {
        let identity = IdentityClient::new(&config.identity)?;
        let courses = CourseResolver::new(identity.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                identity,
                courses,
                attempts: AttemptRegistry::new(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the identity API client.
    #[must_use]
    pub fn identity(&self) -> &IdentityClient {
        &self.inner.identity
    }

    #[must_use]
    pub fn courses(&self) -> &CourseResolver {
        &self.inner.courses
    }

    /// Locks and liveness for open OTP modals.
    #[must_use]
    pub fn attempts(&self) -> &AttemptRegistry {
        &self.inner.attempts
    }
}
