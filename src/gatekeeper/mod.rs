//! Ingress gatekeeping.
//!
//! Two independent policies composed in front of the router, each applied
//! as axum middleware before any business logic runs:
//!
//! - [`filter_origin`] - origin allow-listing with a trusted wildcard
//!   suffix; requests without an `Origin` header (curl, mobile clients)
//!   pass through.
//! - [`throttle`] - per-client-IP request budget over a fixed window.
//!
//! Neither policy consults or mutates feedback state.

mod origin;
mod rate_limit;

pub use origin::{filter_origin, OriginPolicy};
pub use rate_limit::{throttle, PerIpRateLimiter, RateLimiterConfig};
