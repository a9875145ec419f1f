//! Mailgun webhook signature verification.
//!
//! Mailgun signs every event webhook using HMAC-SHA256.
//! Reference: https://documentation.mailgun.com/docs/mailgun/user-manual/events/webhooks/#securing-webhooks

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Errors raised while checking a signature.
///
/// A signature that merely does not match is not an error, see
/// [`verify_mailgun_signature`].
#[derive(Debug, Error)]
pub enum SignatureError {
    /// The `signature` field is not a hex string.
    #[error("signature is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Compute the raw HMAC-SHA256 digest of `timestamp` followed by `token`.
pub fn compute_signature(signing_key: &str, timestamp: &str, token: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(signing_key.as_bytes())
        .expect("HMAC can take key of any size");

    mac.update(timestamp.as_bytes());
    mac.update(token.as_bytes());

    mac.finalize().into_bytes().to_vec()
}

/// Verify a Mailgun webhook signature.
///
/// Mailgun webhooks include three fields for signature verification:
/// - timestamp: Unix epoch seconds when the webhook was generated
/// - token: A randomly generated string
/// - signature: HMAC-SHA256 hex digest of timestamp + token
///
/// # Returns
///
/// `Ok(true)` when the signature matches, `Ok(false)` when it does not
/// (including a decoded length that differs from the digest), and
/// `Err(SignatureError::InvalidHex)` when the signature cannot be decoded.
/// Callers treat an error as a failed verification.
pub fn verify_mailgun_signature(
    signing_key: &str,
    timestamp: &str,
    token: &str,
    signature: &str,
) -> Result<bool, SignatureError> {
    let provided = hex::decode(signature)?;
    let expected = compute_signature(signing_key, timestamp, token);

    if expected.len() != provided.len() {
        debug!(
            expected_length = expected.len(),
            actual_length = provided.len(),
            "mailgun_signature_length_mismatch"
        );
        return Ok(false);
    }

    Ok(constant_time_compare(&expected, &provided))
}

/// Check that a webhook timestamp lies within `max_age_seconds` of now.
///
/// Non-numeric timestamps are never fresh. Clock skew in either direction
/// counts towards the age.
pub fn is_fresh(timestamp: &str, max_age_seconds: u64) -> bool {
    let webhook_time: u64 = match timestamp.parse() {
        Ok(t) => t,
        Err(_) => {
            debug!(timestamp = %timestamp, "mailgun_signature_invalid_timestamp");
            return false;
        }
    };

    let current_time = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let age = current_time.abs_diff(webhook_time);

    if age > max_age_seconds {
        debug!(
            webhook_time = webhook_time,
            current_time = current_time,
            age_seconds = age,
            max_age_seconds = max_age_seconds,
            "mailgun_signature_stale"
        );
        return false;
    }

    true
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
