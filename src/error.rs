//! Error taxonomy and the response mapper.
//!
//! All failures in the request path are expressed as one [`FeedbackError`]
//! enum and matched exhaustively when rendered - no string-keyed error
//! discrimination anywhere. [`ApiError`] pairs an error with the deployment
//! mode's detail policy and is what handlers and middleware actually return;
//! its `IntoResponse` impl is the single place outcomes become HTTP.
//!
//! Detail suppression: 500-class responses only carry the `error` member in
//! development mode. 400/404-class responses always carry a human-readable
//! `message`.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::{error, warn};

use crate::response::Envelope;
use crate::validation::FieldViolation;

/// All failures that can occur while serving a feedback request.
#[derive(Debug, Error)]
pub enum FeedbackError {
    /// Required fields absent from a create payload, or an update payload
    /// that supplied none of the mutable fields.
    #[error("{}", missing_fields_message(.fields, .any_of))]
    MissingFields {
        fields: Vec<&'static str>,
        /// True when any one of `fields` would have sufficed (update case).
        any_of: bool,
    },

    /// One or more field constraints violated.
    #[error("Validation error: {}", join_violations(.0))]
    Validation(Vec<FieldViolation>),

    /// The identifier is not a well-formed ObjectId hex string. Distinct
    /// from [`FeedbackError::NotFound`]; callers must not conflate the two.
    #[error("Invalid feedback ID format")]
    MalformedId { id: String },

    /// No record exists for a well-formed identifier.
    #[error("Feedback not found")]
    NotFound { id: String },

    /// The store is unreachable or a driver operation failed.
    #[error("Database connection error")]
    Storage { detail: String },

    /// Request carried an origin outside the allow-list.
    #[error("Origin not allowed")]
    OriginDenied { origin: String },

    /// Per-client request budget exhausted.
    #[error("Too many requests from this IP, please try again later.")]
    Throttled {
        retry_after_secs: u64,
        limit: u32,
        window_secs: u64,
    },

    /// Anything unexpected, including caught panics.
    #[error("Internal server error")]
    Internal { detail: String },
}

fn missing_fields_message(fields: &[&'static str], any_of: &bool) -> String {
    if *any_of {
        "At least one field (name, email, or message) must be provided for update".to_string()
    } else {
        format!("Missing required field(s): {}", fields.join(", "))
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl FeedbackError {
    /// Required create fields that were absent.
    pub fn missing_create_fields(fields: Vec<&'static str>) -> Self {
        Self::MissingFields {
            fields,
            any_of: false,
        }
    }

    /// Update payload with none of the mutable fields supplied.
    pub fn empty_update() -> Self {
        Self::MissingFields {
            fields: vec!["name", "email", "message"],
            any_of: true,
        }
    }

    /// HTTP status for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingFields { .. } | Self::Validation(_) | Self::MalformedId { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::OriginDenied { .. } => StatusCode::FORBIDDEN,
            Self::Throttled { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Storage { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable kind name for logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::MissingFields { .. } => "missing_field",
            Self::Validation(_) => "validation_failure",
            Self::MalformedId { .. } => "malformed_identifier",
            Self::NotFound { .. } => "not_found",
            Self::Storage { .. } => "storage_unavailable",
            Self::OriginDenied { .. } => "origin_denied",
            Self::Throttled { .. } => "throttled",
            Self::Internal { .. } => "unknown_internal",
        }
    }

    /// Internal detail, present only for 500-class failures.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Storage { detail } | Self::Internal { detail } => Some(detail),
            _ => None,
        }
    }
}

impl From<mongodb::error::Error> for FeedbackError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Storage {
            detail: err.to_string(),
        }
    }
}

/// A failure ready to be rendered: the error plus the deployment mode's
/// detail policy. Constructed via [`crate::state::AppState::reject`].
#[derive(Debug)]
pub struct ApiError {
    kind: FeedbackError,
    expose_detail: bool,
}

impl ApiError {
    pub fn new(kind: FeedbackError, expose_detail: bool) -> Self {
        Self {
            kind,
            expose_detail,
        }
    }

    pub fn kind(&self) -> &FeedbackError {
        &self.kind
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();

        if status.is_server_error() {
            error!(
                kind = self.kind.kind_name(),
                detail = self.kind.detail().unwrap_or(""),
                "Request failed"
            );
        } else {
            warn!(
                kind = self.kind.kind_name(),
                reason = %self.kind,
                "Request rejected"
            );
        }

        let mut envelope = Envelope::failure(self.kind.to_string());
        if self.expose_detail && status.is_server_error() {
            envelope.error = self.kind.detail().map(str::to_owned);
        }

        let mut response = (status, Json(envelope)).into_response();

        if let FeedbackError::Throttled {
            retry_after_secs,
            limit,
            window_secs,
        } = &self.kind
        {
            let headers = response.headers_mut();
            headers.insert("Retry-After", HeaderValue::from(*retry_after_secs));
            headers.insert("RateLimit-Limit", HeaderValue::from(*limit));
            headers.insert("RateLimit-Remaining", HeaderValue::from(0u16));
            if let Ok(policy) = HeaderValue::from_str(&format!("{limit};w={window_secs}")) {
                headers.insert("RateLimit-Policy", policy);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(
            FeedbackError::missing_create_fields(vec!["name"]).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            FeedbackError::Validation(vec![]).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            FeedbackError::MalformedId { id: "x".into() }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            FeedbackError::NotFound { id: "x".into() }.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            FeedbackError::Storage { detail: "x".into() }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            FeedbackError::OriginDenied { origin: "x".into() }.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            FeedbackError::Throttled {
                retry_after_secs: 9,
                limit: 100,
                window_secs: 900
            }
            .status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            FeedbackError::Internal { detail: "x".into() }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_missing_fields_messages() {
        let create = FeedbackError::missing_create_fields(vec!["email", "message"]);
        assert_eq!(
            create.to_string(),
            "Missing required field(s): email, message"
        );

        let update = FeedbackError::empty_update();
        assert_eq!(
            update.to_string(),
            "At least one field (name, email, or message) must be provided for update"
        );
    }

    #[test]
    fn test_validation_message_lists_every_violation() {
        let err = FeedbackError::Validation(vec![
            FieldViolation {
                field: "name",
                reason: "Name must be at least 2 characters long".into(),
            },
            FieldViolation {
                field: "email",
                reason: "Please enter a valid email address".into(),
            },
        ]);
        let message = err.to_string();
        assert!(message.starts_with("Validation error: "));
        assert!(message.contains("name: Name must be at least 2 characters long"));
        assert!(message.contains("email: Please enter a valid email address"));
    }

    #[tokio::test]
    async fn test_storage_detail_suppressed_in_production() {
        let err = ApiError::new(
            FeedbackError::Storage {
                detail: "pool timed out".into(),
            },
            false,
        );
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Database connection error");
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn test_storage_detail_echoed_in_development() {
        let err = ApiError::new(
            FeedbackError::Storage {
                detail: "pool timed out".into(),
            },
            true,
        );
        let json = body_json(err.into_response()).await;
        assert_eq!(json["error"], "pool timed out");
    }

    #[tokio::test]
    async fn test_throttled_response_carries_rate_headers() {
        let err = ApiError::new(
            FeedbackError::Throttled {
                retry_after_secs: 42,
                limit: 100,
                window_secs: 900,
            },
            true,
        );
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["Retry-After"], "42");
        assert_eq!(response.headers()["RateLimit-Limit"], "100");
        assert_eq!(response.headers()["RateLimit-Remaining"], "0");
        assert_eq!(response.headers()["RateLimit-Policy"], "100;w=900");

        let json = body_json(response).await;
        assert_eq!(
            json["message"],
            "Too many requests from this IP, please try again later."
        );
    }

    #[tokio::test]
    async fn test_client_errors_never_expose_detail_member() {
        let err = ApiError::new(FeedbackError::NotFound { id: "abc".into() }, true);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = body_json(response).await;
        assert_eq!(json["message"], "Feedback not found");
        assert!(json.get("error").is_none());
    }
}
