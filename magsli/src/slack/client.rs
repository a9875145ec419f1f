//! Outbound delivery to a Slack incoming webhook.

use std::time::Duration;

use reqwest::{header::CONTENT_TYPE, Client};
use thiserror::Error;
use tracing::info;
use url::Url;

use super::message::Message;

/// Errors raised while posting a message.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("webhook responded with status {0}")]
    Status(u16),
}

/// Posts messages to a single Slack webhook URL.
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct SlackClient {
    client: Client,
    webhook_url: Url,
    timeout: Duration,
}

impl SlackClient {
    pub fn new(client: Client, webhook_url: Url, timeout: Duration) -> Self {
        Self {
            client,
            webhook_url,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST the message once. Non-2xx responses are errors.
    pub async fn send(&self, message: &Message) -> Result<(), SendError> {
        let body = serde_json::to_vec(message)?;
        let body_length = body.len();

        let response = self
            .client
            .post(self.webhook_url.clone())
            .timeout(self.timeout)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SendError::Timeout(self.timeout)
                } else {
                    SendError::Request(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SendError::Status(status.as_u16()));
        }

        info!(
            status_code = status.as_u16(),
            body_length = body_length,
            attachments = message.attachments().len(),
            "slack_message_sent"
        );

        Ok(())
    }
}
