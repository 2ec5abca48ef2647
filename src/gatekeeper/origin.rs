//! Origin allow-listing.
//!
//! A request is allowed through when it carries no `Origin` header, when
//! its origin exactly matches the configured allow-list, or when the
//! origin's host ends with the trusted wildcard suffix (any subdomain of a
//! trusted hosting domain). Everything else is rejected with a 403 envelope
//! before any handler runs.
//!
//! Allowed browser origins get the CORS response headers echoed back, and
//! preflight `OPTIONS` requests are answered directly from this layer.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::config::AppConfig;
use crate::error::FeedbackError;
use crate::state::AppState;

/// Declarative origin policy: exact allow-list plus optional trusted
/// suffix.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Vec<String>,
    trusted_suffix: Option<String>,
}

impl OriginPolicy {
    pub fn new(allowed: Vec<String>, trusted_suffix: Option<String>) -> Self {
        Self {
            allowed,
            trusted_suffix,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.allowed_origins.clone(),
            config.trusted_origin_suffix.clone(),
        )
    }

    /// Whether a request with the given `Origin` header may proceed.
    pub fn allows(&self, origin: Option<&str>) -> bool {
        let Some(origin) = origin else {
            // Non-browser clients send no Origin header.
            return true;
        };
        if self.allowed.iter().any(|allowed| allowed == origin) {
            return true;
        }
        self.trusted_suffix
            .as_deref()
            .is_some_and(|suffix| origin_host(origin).ends_with(suffix))
    }
}

/// Host portion of an origin value: scheme and port stripped.
fn origin_host(origin: &str) -> &str {
    let after_scheme = origin.split_once("://").map_or(origin, |(_, rest)| rest);
    let authority = after_scheme.split('/').next().unwrap_or(after_scheme);
    match authority.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => host,
        _ => authority,
    }
}

/// Middleware enforcing the origin policy ahead of the router.
pub async fn filter_origin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    if !state.origin_policy.allows(origin.as_deref()) {
        let origin = origin.unwrap_or_default();
        warn!(origin = %origin, "Blocked request from disallowed origin");
        return state
            .reject(FeedbackError::OriginDenied { origin })
            .into_response();
    }

    if req.method() == Method::OPTIONS {
        if let Some(origin) = origin {
            return preflight_response(&origin);
        }
    }

    let mut response = next.run(req).await;
    if let Some(origin) = origin {
        apply_cors_headers(response.headers_mut(), &origin);
    }
    response
}

fn preflight_response(origin: &str) -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    apply_cors_headers(headers, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization, X-Requested-With"),
    );
    response
}

fn apply_cors_headers(headers: &mut HeaderMap, origin: &str) {
    if let Ok(value) = HeaderValue::from_str(origin) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.append(header::VARY, HeaderValue::from_static("Origin"));
    }
}
