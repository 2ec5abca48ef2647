//! Shared application state.

use std::sync::Arc;
use std::time::Instant;

use crate::config::AppConfig;
use crate::error::{ApiError, FeedbackError};
use crate::gatekeeper::{OriginPolicy, PerIpRateLimiter};
use crate::store::FeedbackStore;

/// State handed to every handler and middleware.
///
/// Cloning is cheap: the store wraps the driver's pooled client, and the
/// remaining members are behind `Arc`s.
#[derive(Clone)]
pub struct AppState {
    pub store: FeedbackStore,
    pub config: Arc<AppConfig>,
    pub origin_policy: Arc<OriginPolicy>,
    pub rate_limiter: Arc<PerIpRateLimiter>,
    /// Process start, for the health endpoint's uptime field.
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        store: FeedbackStore,
        config: Arc<AppConfig>,
        rate_limiter: Arc<PerIpRateLimiter>,
    ) -> Self {
        let origin_policy = Arc::new(OriginPolicy::from_config(&config));
        Self {
            store,
            config,
            origin_policy,
            rate_limiter,
            started_at: Instant::now(),
        }
    }

    /// Wrap a failure for the response mapper. Internal detail is echoed to
    /// clients only in development mode.
    pub fn reject(&self, kind: FeedbackError) -> ApiError {
        ApiError::new(kind, self.config.environment.is_development())
    }
}
