//! Mailgun event webhook handling.
//!
//! ## Processing Flow
//!
//! ```text
//! form body → parse_form_lenient() → verify_mailgun_signature()
//!           → parse_form() → EventData::from_fields()
//! ```

pub mod event;
pub mod headers;
pub mod signature;

pub use event::{parse_form, parse_form_lenient, DecodeError, EventData, FormFields, ERROR_EVENTS};
pub use headers::{extract_subject, extract_subject_positional, SubjectLookup, SUBJECT_PLACEHOLDER};
pub use signature::{compute_signature, is_fresh, verify_mailgun_signature, SignatureError};
