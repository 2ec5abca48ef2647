//! ParkNet feedback service - JSON/HTTP API for collecting user feedback.
//!
//! Clients submit free-text feedback records; the service stores, lists,
//! updates, and deletes them against a MongoDB collection. Every request
//! passes through an ingress gatekeeper (origin filtering plus per-client
//! rate limiting) before reaching the handlers, and every outcome is
//! rendered through a single response envelope.
//!
//! # Architecture
//!
//! - [`config`] -- Environment-driven configuration (`MONGODB_URL`, `PORT`,
//!   allow-listed origins, rate-limit window, deployment mode).
//! - [`error`] -- Unified error taxonomy using `thiserror`, mapped
//!   exhaustively to HTTP status codes and envelope bodies.
//! - [`gatekeeper`] -- Origin allow-listing and per-IP request throttling,
//!   applied as middleware ahead of all business logic.
//! - [`logging`] -- Structured request/response tracing via `tower-http`.
//! - [`model`] -- Stored (BSON) and wire (JSON) shapes of a feedback record.
//! - [`response`] -- The uniform `{success, data, count, message, error}`
//!   envelope and the `/health` payload.
//! - [`routes`] -- Axum router and handlers sequencing
//!   parse -> validate -> persist -> map.
//! - [`state`] -- Shared application state handed to handlers and middleware.
//! - [`store`] -- MongoDB-backed persistence with explicit open/close
//!   lifecycle and store-level re-validation.
//! - [`validation`] -- Pure field rules shared by the request layer and the
//!   storage boundary.

pub mod config;
pub mod error;
pub mod gatekeeper;
pub mod logging;
pub mod model;
pub mod response;
pub mod routes;
pub mod state;
pub mod store;
pub mod validation;
