//! Router and request handlers.
//!
//! Handlers sequence the same four steps for every operation: the
//! gatekeeper has already passed, so parse the payload, validate it, invoke
//! the store, and map the outcome into the response envelope. Failures flow
//! through [`ApiError`] so no raw driver error ever reaches a client, and a
//! panic anywhere in the stack is caught and rendered as a 500 envelope.

use std::any::Any;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{header, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{middleware, Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::error;

use crate::error::{ApiError, FeedbackError};
use crate::gatekeeper;
use crate::logging;
use crate::response::{Envelope, HealthResponse};
use crate::state::AppState;
use crate::validation::{self, FeedbackFields, FieldViolation};

/// Request body cap, matching the original deployment's parser limit.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Build the application router with the full middleware stack.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/feedbacks",
            get(list_feedbacks).post(create_feedback),
        )
        .route(
            "/api/feedbacks/{id}",
            get(get_feedback).put(update_feedback).delete(delete_feedback),
        )
        .route("/health", get(health))
        .fallback(unknown_route)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gatekeeper::throttle,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gatekeeper::filter_origin,
        ))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(logging::layer())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .with_state(state)
}

/// Create/update payload: any subset of the three mutable fields.
#[derive(Debug, Deserialize)]
pub struct FeedbackPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

impl From<FeedbackPayload> for FeedbackFields {
    fn from(payload: FeedbackPayload) -> Self {
        Self {
            name: payload.name,
            email: payload.email,
            message: payload.message,
        }
    }
}

fn invalid_body(rejection: &JsonRejection) -> FeedbackError {
    FeedbackError::Validation(vec![FieldViolation {
        field: "body",
        reason: rejection.body_text(),
    }])
}

/// `POST /api/feedbacks` - submit a new feedback record.
async fn create_feedback(
    State(state): State<AppState>,
    payload: Result<Json<FeedbackPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(|rejection| state.reject(invalid_body(&rejection)))?;
    let fields = FeedbackFields::from(payload);

    let missing = fields.missing_for_create();
    if !missing.is_empty() {
        return Err(state.reject(FeedbackError::missing_create_fields(missing)));
    }
    // Fast rejection; the store runs the same rules again at the boundary.
    validation::validate(&fields)
        .map_err(|violations| state.reject(FeedbackError::Validation(violations)))?;

    let record = state
        .store
        .create(&fields)
        .await
        .map_err(|err| state.reject(err))?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::success_with_message(
            record,
            "Feedback created successfully",
        )),
    )
        .into_response())
}

/// `GET /api/feedbacks` - all records, most recent first.
async fn list_feedbacks(State(state): State<AppState>) -> Result<Response, ApiError> {
    let records = state
        .store
        .list_all()
        .await
        .map_err(|err| state.reject(err))?;
    let count = records.len();
    Ok(Json(Envelope::listed(records, count)).into_response())
}

/// `GET /api/feedbacks/{id}` - one record by identifier.
async fn get_feedback(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let record = state
        .store
        .get_by_id(&id)
        .await
        .map_err(|err| state.reject(err))?;
    Ok(Json(Envelope::success(record)).into_response())
}

/// `PUT /api/feedbacks/{id}` - partial update; at least one field required.
async fn update_feedback(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<FeedbackPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(|rejection| state.reject(invalid_body(&rejection)))?;
    let fields = FeedbackFields::from(payload);

    if fields.is_empty() {
        return Err(state.reject(FeedbackError::empty_update()));
    }
    validation::validate(&fields)
        .map_err(|violations| state.reject(FeedbackError::Validation(violations)))?;

    let record = state
        .store
        .update_partial(&id, &fields)
        .await
        .map_err(|err| state.reject(err))?;

    Ok(Json(Envelope::success_with_message(
        record,
        "Feedback updated successfully",
    ))
    .into_response())
}

/// `DELETE /api/feedbacks/{id}` - remove a record and return it.
async fn delete_feedback(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let record = state
        .store
        .delete_by_id(&id)
        .await
        .map_err(|err| state.reject(err))?;
    Ok(Json(Envelope::success_with_message(
        record,
        "Feedback deleted successfully",
    ))
    .into_response())
}

/// `GET /health` - liveness probe with uptime and deployment mode.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        message: "ParkNet feedback service is running".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        environment: state.config.environment.as_str(),
    })
}

/// Fallback for undefined routes.
async fn unknown_route(uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(Envelope::failure(format!("Route {uri} not found"))),
    )
        .into_response()
}

/// Top-level panic handler: render the 500 envelope instead of tearing the
/// connection down.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> http::Response<axum::body::Body> {
    let detail = if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    error!(detail = %detail, "Handler panicked");

    let body = serde_json::to_string(&Envelope::failure("Internal server error"))
        .unwrap_or_else(|_| r#"{"success":false,"message":"Internal server error"}"#.to_string());
    http::Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(body))
        .expect("BUG: static response parts are valid")
}
