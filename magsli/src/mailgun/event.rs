//! Mailgun event decoding.
//!
//! Mailgun posts legacy event webhooks as `application/x-www-form-urlencoded`
//! bodies. Field names are Mailgun's own (`Message-Id`, `message-headers`,
//! ...). Which optional fields are present depends on the event type.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;
use url::form_urlencoded;

use super::headers::SubjectLookup;

/// Event types that indicate a delivery problem.
pub const ERROR_EVENTS: [&str; 4] = ["bounced", "dropped", "failed", "rejected"];

/// Flat form fields, first value wins for repeated keys.
pub type FormFields = HashMap<String, String>;

/// Errors raised while reading the inbound form.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body or query string is not UTF-8.
    #[error("form data is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),

    /// A `%` is not followed by two hex digits.
    #[error("invalid percent escape at offset {0}")]
    InvalidEscape(usize),
}

/// Parse a form-encoded body plus an optional URL query string.
///
/// Body fields take precedence; the query only fills keys the body lacks.
pub fn parse_form(body: &[u8], query: Option<&str>) -> Result<FormFields, DecodeError> {
    let body = std::str::from_utf8(body)?;
    check_escapes(body)?;

    let mut fields = FormFields::new();
    insert_pairs(&mut fields, body.as_bytes());

    if let Some(query) = query {
        check_escapes(query)?;
        insert_pairs(&mut fields, query.as_bytes());
    }

    debug!(field_count = fields.len(), "mailgun_form_parsed");

    Ok(fields)
}

/// Parse the same input as [`parse_form`] without rejecting anything.
///
/// Bad escapes are kept literally and invalid UTF-8 is replaced. Used to
/// read the signature fields of a body that may not decode.
pub fn parse_form_lenient(body: &[u8], query: Option<&str>) -> FormFields {
    let mut fields = FormFields::new();
    insert_pairs(&mut fields, body);

    if let Some(query) = query {
        insert_pairs(&mut fields, query.as_bytes());
    }

    fields
}

fn insert_pairs(fields: &mut FormFields, encoded: &[u8]) {
    for (key, value) in form_urlencoded::parse(encoded) {
        fields
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }
}

fn check_escapes(encoded: &str) -> Result<(), DecodeError> {
    let bytes = encoded.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .map(|hex| hex.iter().all(u8::is_ascii_hexdigit))
                .unwrap_or(false);

            if !valid {
                return Err(DecodeError::InvalidEscape(i));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    Ok(())
}

/// The fields of a Mailgun event used to build a Slack message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventData {
    pub event_type: String,
    pub domain: String,
    pub recipient: String,
    pub message_id: String,
    pub subject: String,

    // bounced
    pub smtp_code: String,
    pub smtp_error: String,

    // dropped
    pub reason: String,
    pub esp_code: String,
    pub description: String,
}

impl EventData {
    /// Build an event from parsed form fields.
    ///
    /// Unknown event types keep only the base fields. The subject is read
    /// from `message-headers` only when that field is present, so a form
    /// without any known field decodes to an empty event.
    pub fn from_fields(fields: &FormFields, lookup: SubjectLookup) -> Self {
        let get = |name: &str| fields.get(name).cloned().unwrap_or_default();

        let subject = match fields.get("message-headers") {
            Some(headers) if !headers.is_empty() => lookup.extract(headers),
            _ => String::new(),
        };

        let mut data = EventData {
            event_type: get("event"),
            domain: get("domain"),
            recipient: get("recipient"),
            message_id: get("Message-Id"),
            subject,
            ..Default::default()
        };

        match data.event_type.as_str() {
            "bounced" => {
                data.smtp_code = get("code");
                data.smtp_error = get("error");
            }
            "dropped" => {
                data.reason = get("reason");
                data.esp_code = get("code");
                data.description = get("description");
            }
            _ => {}
        }

        data
    }

    /// Whether the event type should be reported as an error.
    pub fn is_error_event(&self) -> bool {
        ERROR_EVENTS.contains(&self.event_type.as_str())
    }

    /// True when nothing was decoded at all.
    pub fn is_empty(&self) -> bool {
        *self == EventData::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> FormFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_form_decodes_values() {
        let body = b"event=bounced&recipient=alice%40example.com&error=5.1.1+User+unknown";
        let parsed = parse_form(body, None).unwrap();

        assert_eq!(parsed["event"], "bounced");
        assert_eq!(parsed["recipient"], "alice@example.com");
        assert_eq!(parsed["error"], "5.1.1 User unknown");
    }

    #[test]
    fn test_parse_form_first_value_wins() {
        let parsed = parse_form(b"event=opened&event=clicked", None).unwrap();
        assert_eq!(parsed["event"], "opened");
    }

    #[test]
    fn test_parse_form_body_beats_query() {
        let parsed = parse_form(b"event=opened", Some("event=clicked&domain=mg.example.com")).unwrap();
        assert_eq!(parsed["event"], "opened");
        assert_eq!(parsed["domain"], "mg.example.com");
    }

    #[test]
    fn test_parse_form_invalid_escape() {
        assert!(matches!(
            parse_form(b"event=%zzbounced", None),
            Err(DecodeError::InvalidEscape(6))
        ));
        assert!(matches!(
            parse_form(b"event=bounced%2", None),
            Err(DecodeError::InvalidEscape(13))
        ));
        assert!(matches!(
            parse_form(b"event=ok", Some("x=%")),
            Err(DecodeError::InvalidEscape(2))
        ));
    }

    #[test]
    fn test_parse_form_not_utf8() {
        assert!(matches!(
            parse_form(&[b'e', b'=', 0xff, 0xfe], None),
            Err(DecodeError::NotUtf8(_))
        ));
    }

    #[test]
    fn test_parse_form_lenient_keeps_going() {
        let body = b"timestamp=1&token=t&description=%zz&signature=ab%2";
        assert!(parse_form(body, None).is_err());

        let parsed = parse_form_lenient(body, Some("token=ignored&domain=d"));
        assert_eq!(parsed["timestamp"], "1");
        assert_eq!(parsed["token"], "t");
        assert_eq!(parsed["description"], "%zz");
        assert_eq!(parsed["signature"], "ab%2");
        assert_eq!(parsed["domain"], "d");

        let parsed = parse_form_lenient(&[b't', b'o', b'k', b'e', b'n', b'=', 0xff], None);
        assert_eq!(parsed["token"], "\u{fffd}");
    }

    #[test]
    fn test_parse_form_empty() {
        assert!(parse_form(b"", None).unwrap().is_empty());
    }

    #[test]
    fn test_from_fields_bounced() {
        let data = EventData::from_fields(
            &fields(&[
                ("event", "bounced"),
                ("domain", "mg.example.com"),
                ("recipient", "alice@example.com"),
                ("Message-Id", "<20130503182626.18666.16540@mg.example.com>"),
                ("message-headers", r#"[["A", "1"], ["B", "2"], ["C", "3"], ["Subject", "Test bounces webhook"]]"#),
                ("code", "550"),
                ("error", "No such mailbox"),
                ("reason", "ignored for bounces"),
            ]),
            SubjectLookup::Scan,
        );

        assert_eq!(data.event_type, "bounced");
        assert_eq!(data.domain, "mg.example.com");
        assert_eq!(data.recipient, "alice@example.com");
        assert_eq!(data.message_id, "<20130503182626.18666.16540@mg.example.com>");
        assert_eq!(data.subject, "Test bounces webhook");
        assert_eq!(data.smtp_code, "550");
        assert_eq!(data.smtp_error, "No such mailbox");
        assert!(data.reason.is_empty());
    }

    #[test]
    fn test_from_fields_dropped() {
        let data = EventData::from_fields(
            &fields(&[
                ("event", "dropped"),
                ("code", "605"),
                ("reason", "hardfail"),
                ("description", "Not delivering to previously bounced address"),
                ("error", "ignored for drops"),
            ]),
            SubjectLookup::Scan,
        );

        assert_eq!(data.reason, "hardfail");
        assert_eq!(data.esp_code, "605");
        assert_eq!(data.description, "Not delivering to previously bounced address");
        assert!(data.smtp_code.is_empty());
        assert!(data.smtp_error.is_empty());
    }

    #[test]
    fn test_from_fields_unknown_event() {
        let data = EventData::from_fields(
            &fields(&[("event", "complained"), ("domain", "mg.example.com"), ("code", "1")]),
            SubjectLookup::Scan,
        );

        assert_eq!(data.event_type, "complained");
        assert_eq!(data.domain, "mg.example.com");
        assert!(data.smtp_code.is_empty());
        assert!(data.esp_code.is_empty());
        assert!(!data.is_empty());
    }

    #[test]
    fn test_from_fields_subject_placeholder() {
        let data = EventData::from_fields(
            &fields(&[("event", "delivered"), ("message-headers", "[]")]),
            SubjectLookup::Scan,
        );
        assert_eq!(data.subject, crate::mailgun::headers::SUBJECT_PLACEHOLDER);
    }

    #[test]
    fn test_from_fields_nothing_known_is_empty() {
        let data = EventData::from_fields(&fields(&[("unrelated", "x")]), SubjectLookup::Scan);
        assert!(data.is_empty());
        assert!(EventData::default().is_empty());
    }

    #[test]
    fn test_is_error_event() {
        for event in ERROR_EVENTS {
            let data = EventData {
                event_type: event.to_string(),
                ..Default::default()
            };
            assert!(data.is_error_event(), "{} should be an error", event);
        }

        for event in ["delivered", "opened", "clicked", "", "Bounced"] {
            let data = EventData {
                event_type: event.to_string(),
                ..Default::default()
            };
            assert!(!data.is_error_event(), "{} should not be an error", event);
        }
    }
}
