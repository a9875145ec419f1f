//! Mailgun event to Slack message conversion.

use tracing::debug;

use crate::mailgun::EventData;
use crate::slack::Message;

/// Build the Slack message describing a Mailgun event.
///
/// Base fields go to the "Data" attachment. The event type itself goes to
/// "Errors" for error events, and the bounce/drop details always do.
/// Empty values never produce a field.
pub fn build_message(data: &EventData) -> Message {
    let mut msg = Message::new(format!("MailGun message for domain: {}", data.domain));

    if data.is_error_event() {
        msg.add_error("Event", &data.event_type, true);
    } else {
        msg.add_data("Event", &data.event_type, true);
    }

    msg.add_data("Message ID", &data.message_id, false);
    msg.add_data("Recipient", &data.recipient, true);
    msg.add_data("Subject", &data.subject, true);

    match data.event_type.as_str() {
        "bounced" => {
            msg.add_error("SMTP Code", &data.smtp_code, true);
            msg.add_error("SMTP Error", &data.smtp_error, false);
        }
        "dropped" => {
            msg.add_error("Reason", &data.reason, true);
            msg.add_error("ESP Code", &data.esp_code, true);
            msg.add_error("Description", &data.description, false);
        }
        _ => {}
    }

    debug!(
        event = %data.event_type,
        attachments = msg.attachments().len(),
        icon = %msg.icon_emoji,
        "slack_message_built"
    );

    msg
}
