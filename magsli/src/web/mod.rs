//! Web server module for receiving Mailgun webhooks.

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{health, mailgun_webhook, AppState, HealthResponse};

/// Build the application router.
///
/// The webhook is served on `/` as well as `/webhooks/mailgun`, so existing
/// Mailgun webhook settings pointing at the root keep working.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", post(mailgun_webhook))
        .route("/webhooks/mailgun", post(mailgun_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
