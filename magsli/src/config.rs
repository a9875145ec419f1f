//! Configuration module for environment variable parsing.
//!
//! Everything is read once at startup and then shared read-only.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::mailgun::SubjectLookup;

pub const ENV_SIGNING_KEY: &str = "MAGSLI_MAILGUN_API_KEY";
pub const ENV_WEBHOOK_URL: &str = "MAGSLI_SLACK_WEBHOOK_URL";
pub const ENV_PORT: &str = "PORT";
pub const ENV_SLACK_TIMEOUT_MS: &str = "MAGSLI_SLACK_TIMEOUT_MS";
pub const ENV_SIGNATURE_MAX_AGE: &str = "MAGSLI_SIGNATURE_MAX_AGE";
pub const ENV_SUBJECT_LOOKUP: &str = "MAGSLI_SUBJECT_LOOKUP";

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SLACK_TIMEOUT_MS: u64 = 1000;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} is not a valid URL: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("{name} must be an http or https URL, got scheme {scheme:?}")]
    UnsupportedScheme { name: &'static str, scheme: String },
}

/// Application configuration.
#[derive(Clone)]
pub struct Config {
    /// Mailgun webhook signing key for HMAC signature verification
    pub mailgun_signing_key: String,

    /// Slack incoming webhook to post to
    pub slack_webhook_url: Url,

    /// Port for the web server to listen on
    pub port: u16,

    /// Timeout for the single Slack POST, in milliseconds
    pub slack_timeout_ms: u64,

    /// Maximum age in seconds for webhook timestamps; `None` disables the check
    pub signature_max_age: Option<u64>,

    /// How the subject is located in `message-headers`
    pub subject_lookup: SubjectLookup,
}

impl Config {
    /// Configuration with defaults for everything but the two required values.
    pub fn new(mailgun_signing_key: impl Into<String>, slack_webhook_url: Url) -> Self {
        Config {
            mailgun_signing_key: mailgun_signing_key.into(),
            slack_webhook_url,
            port: DEFAULT_PORT,
            slack_timeout_ms: DEFAULT_SLACK_TIMEOUT_MS,
            signature_max_age: None,
            subject_lookup: SubjectLookup::default(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mailgun_signing_key = required(&var, ENV_SIGNING_KEY)?;
        let slack_webhook_url = parse_webhook_url(&required(&var, ENV_WEBHOOK_URL)?)?;

        let mut config = Config::new(mailgun_signing_key, slack_webhook_url);

        config.port = parse_or(&var, ENV_PORT, DEFAULT_PORT);
        config.slack_timeout_ms = parse_or(&var, ENV_SLACK_TIMEOUT_MS, DEFAULT_SLACK_TIMEOUT_MS);
        config.signature_max_age = parse_optional(&var, ENV_SIGNATURE_MAX_AGE);
        config.subject_lookup = parse_or(&var, ENV_SUBJECT_LOOKUP, SubjectLookup::default());

        Ok(config)
    }

    pub fn slack_timeout(&self) -> Duration {
        Duration::from_millis(self.slack_timeout_ms)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("mailgun_signing_key", &"<redacted>")
            .field("slack_webhook_url", &"<redacted>")
            .field("port", &self.port)
            .field("slack_timeout_ms", &self.slack_timeout_ms)
            .field("signature_max_age", &self.signature_max_age)
            .field("subject_lookup", &self.subject_lookup)
            .finish()
    }
}

fn required<F>(var: &F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    var(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parse_webhook_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
        name: ENV_WEBHOOK_URL,
        source,
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ConfigError::UnsupportedScheme {
            name: ENV_WEBHOOK_URL,
            scheme: scheme.to_string(),
        }),
    }
}

/// Parse an optional variable, falling back to `default` when unset or invalid.
fn parse_or<F, T>(var: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let raw = match var(name) {
        Some(v) if !v.trim().is_empty() => v,
        _ => return default,
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// Parse a variable that has no default; invalid values count as unset.
fn parse_optional<F, T>(var: &F, name: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let raw = var(name).filter(|v| !v.trim().is_empty())?;

    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, ignoring");
            None
        }
    }
}
