//! Request orchestration: verify, decode, build, send.
//!
//! Every failure is scoped to the request being handled. Authentication
//! failures are dropped without a trace above `debug`, decode and send
//! failures are logged and otherwise ignored. Nothing is retried.

use std::sync::Arc;

use reqwest::Client;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::mailgun::{
    is_fresh, parse_form, parse_form_lenient, verify_mailgun_signature, EventData, FormFields,
};
use crate::notify::build_message;
use crate::slack::SlackClient;

/// What happened to a single inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Signature missing, malformed, mismatched or stale.
    Rejected,
    /// Nothing usable could be read from the form.
    DecodeFailed,
    /// Slack could not be reached or refused the message.
    SendFailed,
    Delivered,
}

/// Relays verified Mailgun events to Slack.
#[derive(Clone)]
pub struct Dispatcher {
    config: Arc<Config>,
    slack: SlackClient,
}

impl Dispatcher {
    pub fn new(config: Arc<Config>, client: Client) -> Self {
        let slack = SlackClient::new(
            client,
            config.slack_webhook_url.clone(),
            config.slack_timeout(),
        );

        Self { config, slack }
    }

    /// Handle one inbound webhook body and its URL query string.
    ///
    /// The signature fields are read leniently so that a signed request
    /// with a malformed body is reported as a decode failure.
    pub async fn handle(&self, body: &[u8], query: Option<&str>) -> Outcome {
        if !self.is_authentic(&parse_form_lenient(body, query)) {
            return Outcome::Rejected;
        }

        let form = parse_form(body, query);

        let data = match &form {
            Ok(fields) => EventData::from_fields(fields, self.config.subject_lookup),
            Err(_) => EventData::default(),
        };

        if data.is_empty() {
            match &form {
                Err(e) => warn!(error = %e, "mailgun_decode_failed"),
                Ok(fields) => warn!(field_count = fields.len(), "mailgun_decode_failed"),
            }
            return Outcome::DecodeFailed;
        }

        info!(
            event = %data.event_type,
            domain = %data.domain,
            is_error_event = data.is_error_event(),
            "mailgun_event_received"
        );

        let message = build_message(&data);

        match self.slack.send(&message).await {
            Ok(()) => Outcome::Delivered,
            Err(e) => {
                error!(
                    error = %e,
                    event = %data.event_type,
                    timeout_ms = self.slack.timeout().as_millis() as u64,
                    "slack_send_failed"
                );
                Outcome::SendFailed
            }
        }
    }

    fn is_authentic(&self, fields: &FormFields) -> bool {
        let field = |name: &str| fields.get(name).map(String::as_str).unwrap_or("");
        let timestamp = field("timestamp");

        let valid = match verify_mailgun_signature(
            &self.config.mailgun_signing_key,
            timestamp,
            field("token"),
            field("signature"),
        ) {
            Ok(valid) => valid,
            Err(e) => {
                debug!(error = %e, "mailgun_signature_malformed");
                false
            }
        };

        if !valid {
            debug!("mailgun_signature_invalid");
            return false;
        }

        match self.config.signature_max_age {
            Some(max_age) => is_fresh(timestamp, max_age),
            None => true,
        }
    }
}
