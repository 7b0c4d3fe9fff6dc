//! Validation and sanitization of event data.

mod sanitizer;
mod timestamp;

pub use sanitizer::{DataSanitizer, IssueSeverity, ValidationIssue, ValidationOutcome};
pub use timestamp::parse_timestamp;
