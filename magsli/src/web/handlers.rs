//! Webhook endpoint handlers.
//!
//! Mailgun only needs to know that the request arrived, so the webhook
//! endpoint answers `200 OK` with an empty body whatever happens inside.

use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::debug;

use crate::dispatch::Dispatcher;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Mailgun Webhook
// =============================================================================

/// Mailgun event webhook endpoint.
///
/// The raw body is handed to the dispatcher so that form decoding errors
/// stay on the dispatcher's side of the fail-silent policy.
pub async fn mailgun_webhook(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> StatusCode {
    let outcome = state.dispatcher.handle(&body, query.as_deref()).await;

    debug!(outcome = ?outcome, body_length = body.len(), "mailgun_webhook_handled");

    StatusCode::OK
}
