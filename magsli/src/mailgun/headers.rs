//! Subject extraction from Mailgun's `message-headers` field.
//!
//! Mailgun provides the original MIME headers as a JSON array of
//! [name, value] pairs with the header order preserved, e.g.:
//! `[["Received", "..."], ["Subject", "Hello"], ["From", "Bob <bob@foo.com>"]]`
//!
//! It is not a map, and the number of headers varies per message.

use std::str::FromStr;

use serde_json::Value;
use tracing::{debug, warn};

/// Returned whenever the subject cannot be found.
pub const SUBJECT_PLACEHOLDER: &str = "<could not get subject>";

/// Index of the pair the positional lookup trusts to be `Subject`.
const SUBJECT_POSITION: usize = 3;

/// How the subject header is located inside `message-headers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubjectLookup {
    /// First pair named `Subject`, wherever it is.
    #[default]
    Scan,
    /// Only the 4th pair, as Mailgun's sample payloads lay them out.
    Positional,
}

impl SubjectLookup {
    /// Extract the subject using this strategy.
    pub fn extract(self, message_headers: &str) -> String {
        match self {
            SubjectLookup::Scan => extract_subject(message_headers),
            SubjectLookup::Positional => extract_subject_positional(message_headers),
        }
    }
}

impl FromStr for SubjectLookup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scan" => Ok(SubjectLookup::Scan),
            "positional" => Ok(SubjectLookup::Positional),
            other => Err(format!("unknown subject lookup: {}", other)),
        }
    }
}

/// Find the value of the first header named `Subject` (case-insensitive).
///
/// Returns [`SUBJECT_PLACEHOLDER`] when the blob is not a JSON array, has no
/// subject pair, or the subject value is not a string.
pub fn extract_subject(message_headers: &str) -> String {
    let Some(pairs) = parse_pairs(message_headers) else {
        return SUBJECT_PLACEHOLDER.to_string();
    };

    for pair in &pairs {
        let Some(pair) = pair.as_array() else {
            continue;
        };

        let is_subject = pair
            .first()
            .and_then(Value::as_str)
            .map(|name| name.eq_ignore_ascii_case("subject"))
            .unwrap_or(false);

        if is_subject {
            return pair
                .get(1)
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| SUBJECT_PLACEHOLDER.to_string());
        }
    }

    debug!(header_count = pairs.len(), "mailgun_no_subject_in_headers");
    SUBJECT_PLACEHOLDER.to_string()
}

/// Read the subject from the 4th header pair only.
///
/// The pair must be named exactly `Subject`; anything else, including a
/// shorter list, yields [`SUBJECT_PLACEHOLDER`].
pub fn extract_subject_positional(message_headers: &str) -> String {
    let subject = parse_pairs(message_headers).and_then(|pairs| {
        let pair = pairs.get(SUBJECT_POSITION)?.as_array()?;

        if pair.first()?.as_str()? != "Subject" {
            return None;
        }

        pair.get(1)?.as_str().map(str::to_string)
    });

    subject.unwrap_or_else(|| SUBJECT_PLACEHOLDER.to_string())
}

fn parse_pairs(message_headers: &str) -> Option<Vec<Value>> {
    if message_headers.trim().is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(message_headers) {
        Ok(Value::Array(pairs)) => Some(pairs),
        Ok(_) => {
            warn!("mailgun_headers_not_an_array");
            None
        }
        Err(e) => {
            let preview: String = message_headers.chars().take(200).collect();
            warn!(
                error = %e,
                headers_preview = %preview,
                "mailgun_headers_parse_failed"
            );
            None
        }
    }
}
