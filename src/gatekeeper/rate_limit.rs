//! Per-client IP request throttling using the GCRA algorithm.
//!
//! Each unique peer IP address gets its own rate limiter instance, created
//! lazily on first request. The quota admits a burst of the full window
//! budget (default 100 requests) replenishing evenly across the window
//! (default 15 minutes), which behaves as a sliding window over the
//! configured interval. Stale entries are periodically cleaned up to
//! prevent unbounded memory growth.

use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use governor::clock::{Clock, DefaultClock};
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorLimiter};
use std::net::SocketAddr;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::FeedbackError;
use crate::state::AppState;

/// Type alias for the per-IP governor rate limiter.
type IpLimiter = GovernorLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Entry in the per-IP rate limiter map.
struct RateLimitEntry {
    limiter: IpLimiter,
    last_seen: Instant,
}

/// Configuration for the per-IP rate limiter.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Requests allowed per client per window.
    pub max_requests: u32,
    /// Window duration.
    pub window: Duration,
    /// Duration after which an idle IP entry is considered stale.
    pub stale_after: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(15 * 60),
            stale_after: Duration::from_secs(15 * 60),
        }
    }
}

impl From<&AppConfig> for RateLimiterConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_requests: config.rate_limit_max,
            window: config.rate_limit_window,
            // An entry idle for a full window has fully replenished anyway.
            stale_after: config.rate_limit_window,
        }
    }
}

/// Per-client IP rate limiter.
///
/// Wraps a `DashMap` of per-IP governor rate limiters. Stale entries (not
/// seen for `stale_after`) are removed by a background task.
pub struct PerIpRateLimiter {
    limiters: Arc<DashMap<IpAddr, RateLimitEntry>>,
    quota: Quota,
    clock: DefaultClock,
    max_requests: u32,
    window: Duration,
    stale_after: Duration,
}

impl PerIpRateLimiter {
    /// Create a new per-IP rate limiter with the given configuration.
    pub fn new(config: RateLimiterConfig) -> Self {
        let max_requests = NonZeroU32::new(config.max_requests)
            .unwrap_or_else(|| NonZeroU32::new(100).expect("BUG: 100 is non-zero"));
        let replenish_period = (config.window / max_requests.get()).max(Duration::from_millis(1));
        let quota = Quota::with_period(replenish_period)
            .expect("BUG: replenish period is non-zero")
            .allow_burst(max_requests);

        info!(
            max_requests = max_requests.get(),
            window_secs = config.window.as_secs(),
            stale_secs = config.stale_after.as_secs(),
            "Per-IP rate limiter configured"
        );

        Self {
            limiters: Arc::new(DashMap::new()),
            quota,
            clock: DefaultClock::default(),
            max_requests: max_requests.get(),
            window: config.window,
            stale_after: config.stale_after,
        }
    }

    /// Check if a request from the given IP should be allowed.
    ///
    /// Returns the wait until the next request would be admitted when the
    /// budget is exhausted.
    pub fn check(&self, ip: IpAddr) -> Result<(), Duration> {
        let mut entry = self.limiters.entry(ip).or_insert_with(|| RateLimitEntry {
            limiter: GovernorLimiter::direct_with_clock(self.quota, &self.clock),
            last_seen: Instant::now(),
        });
        entry.last_seen = Instant::now();
        entry
            .limiter
            .check()
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    /// Requests allowed per client per window.
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Window duration.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Remove stale entries that haven't been seen within `stale_after`.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_stale(&self) -> usize {
        let cutoff = Instant::now() - self.stale_after;
        let before = self.limiters.len();
        self.limiters.retain(|_, entry| entry.last_seen > cutoff);
        let removed = before - self.limiters.len();
        if removed > 0 {
            debug!(
                removed,
                remaining = self.limiters.len(),
                "Cleaned up stale rate limiter entries"
            );
        }
        removed
    }

    /// Get the number of tracked IPs.
    pub fn tracked_ips(&self) -> usize {
        self.limiters.len()
    }

    /// Spawn a background task that periodically cleans up stale entries.
    ///
    /// The task runs every `stale_after / 2` and stops when the
    /// cancellation token is triggered.
    pub fn spawn_cleanup_task(self: &Arc<Self>, shutdown: tokio_util::sync::CancellationToken) {
        let limiter = Arc::clone(self);
        let interval = limiter.stale_after / 2;
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.tick().await; // Skip immediate first tick
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        limiter.cleanup_stale();
                    }
                    _ = shutdown.cancelled() => {
                        debug!("Rate limiter cleanup task shutting down");
                        break;
                    }
                }
            }
        });
    }
}

/// Middleware enforcing the per-client request budget.
pub async fn throttle(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    match state.rate_limiter.check(addr.ip()) {
        Ok(()) => next.run(req).await,
        Err(wait) => {
            warn!(
                peer = %addr.ip(),
                wait_secs = wait.as_secs(),
                "Throttled request over per-client budget"
            );
            state
                .reject(FeedbackError::Throttled {
                    retry_after_secs: wait.as_secs().max(1),
                    limit: state.rate_limiter.max_requests(),
                    window_secs: state.rate_limiter.window().as_secs(),
                })
                .into_response()
        }
    }
}
