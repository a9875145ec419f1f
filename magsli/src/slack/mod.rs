//! Slack incoming-webhook messages and delivery.

pub mod client;
pub mod message;

pub use client::{SendError, SlackClient};
pub use message::{
    Attachment, Field, Message, ALERT_COLOR, ALERT_ICON, DATA_ATTACHMENT, DEFAULT_ICON,
    DEFAULT_USERNAME, ERROR_ATTACHMENT,
};
