//! Slack incoming-webhook message types.
//!
//! Only the subset of the attachment format used by magsli is modelled.
//! Reference: https://api.slack.com/reference/messaging/attachments

use std::collections::HashMap;

use serde::Serialize;

/// Category key of the attachment holding regular event data.
pub const DATA_ATTACHMENT: &str = "Data";

/// Category key of the attachment holding error details.
pub const ERROR_ATTACHMENT: &str = "Errors";

pub const DEFAULT_USERNAME: &str = "magsli";
pub const DEFAULT_ICON: &str = ":moyai:";
pub const ALERT_ICON: &str = ":rotating_light:";

/// Slack accepts 'good', 'warning', 'danger' or a hex value.
pub const ALERT_COLOR: &str = "danger";

/// A message posted to a Slack webhook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub username: String,
    pub text: String,
    pub icon_emoji: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<Attachment>,
    /// Category key to position in `attachments`.
    #[serde(skip)]
    index: HashMap<String, usize>,
}

/// A group of fields, identified by its fallback text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub fallback: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub color: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
}

/// A title/value pair inside an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub title: String,
    pub value: String,
    /// Short enough to display side-by-side.
    pub short: bool,
}

impl Message {
    /// Create a message with the default username and icon.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            username: DEFAULT_USERNAME.to_string(),
            text: text.into(),
            icon_emoji: DEFAULT_ICON.to_string(),
            attachments: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Attachments in creation order.
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Look up an attachment by category key.
    pub fn attachment(&self, key: &str) -> Option<&Attachment> {
        self.index.get(key).map(|&i| &self.attachments[i])
    }

    /// Add a field to the "Data" attachment. Empty values are ignored.
    pub fn add_data(&mut self, title: &str, value: &str, short: bool) {
        self.add_field(DATA_ATTACHMENT, title, value, short);
    }

    /// Add a field to the "Errors" attachment. Empty values are ignored.
    ///
    /// Any field that is added escalates the attachment color and the
    /// message icon.
    pub fn add_error(&mut self, title: &str, value: &str, short: bool) {
        if let Some(attachment) = self.add_field(ERROR_ATTACHMENT, title, value, short) {
            attachment.color = ALERT_COLOR.to_string();
            self.icon_emoji = ALERT_ICON.to_string();
        }
    }

    fn add_field(
        &mut self,
        key: &str,
        title: &str,
        value: &str,
        short: bool,
    ) -> Option<&mut Attachment> {
        if value.is_empty() {
            return None;
        }

        let attachment = self.find_or_create_attachment(key);
        attachment.fields.push(Field {
            title: title.to_string(),
            value: value.to_string(),
            short,
        });

        Some(attachment)
    }

    fn find_or_create_attachment(&mut self, key: &str) -> &mut Attachment {
        let i = match self.index.get(key).copied() {
            Some(i) => i,
            None => {
                self.attachments.push(Attachment {
                    fallback: key.to_string(),
                    color: String::new(),
                    fields: Vec::new(),
                });
                let i = self.attachments.len() - 1;
                self.index.insert(key.to_string(), i);
                i
            }
        };

        &mut self.attachments[i]
    }
}
