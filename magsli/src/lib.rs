//! magsli - Mailgun event webhooks relayed to Slack.
//!
//! ## Architecture
//!
//! ```text
//! Mailgun → POST / → Dispatcher → verify → decode → build_message → Slack webhook
//! ```
//!
//! Each request is handled on its own; the only shared state is the
//! read-only [`Config`] and the HTTP client's connection pool.

pub mod config;
pub mod dispatch;
pub mod mailgun;
pub mod notify;
pub mod slack;
pub mod web;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use dispatch::{Dispatcher, Outcome};
pub use mailgun::{EventData, SubjectLookup};
pub use notify::build_message;
pub use slack::{Message, SlackClient};
pub use web::AppState;
