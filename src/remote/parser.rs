//! Remote text-understanding collaborator seam.
//!
//! The engine never performs network calls itself: the caller supplies a
//! [`RemoteParser`] implementation and the pipeline consumes either its
//! payload or its classifiable fault. Transport, auth, and HTTP status
//! policy belong to the implementor.

use std::collections::HashMap;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::{EventDraft, EventField, FieldSignal, FieldSource};
use crate::validate::parse_timestamp;

// ============================================================================
// Parser Trait
// ============================================================================

/// A remote service that turns free text into a structured event parse.
#[async_trait]
pub trait RemoteParser: Send + Sync {
    /// Parse the given text, returning a structured payload or a
    /// classifiable fault. Implementations should not retry internally;
    /// the pipeline owns the retry budget.
    async fn parse(&self, text: &str) -> std::result::Result<RemoteParse, ParserError>;
}

/// A parser that is never reachable. Used for offline operation and tests.
pub struct UnavailableParser;

#[async_trait]
impl RemoteParser for UnavailableParser {
    async fn parse(&self, _text: &str) -> std::result::Result<RemoteParse, ParserError> {
        Err(ParserError::Network("parser unavailable".to_string()))
    }
}

// ============================================================================
// Faults
// ============================================================================

/// Classifiable fault from the remote parser.
///
/// `Clone` is deliberate: faults travel inside `FailureContext` copies.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParserError {
    /// Connectivity failure before a response arrived.
    #[error("Network error: {0}")]
    Network(String),

    /// The request exceeded its per-attempt deadline.
    #[error("Request timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// The service answered but the payload could not be understood.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The service refused the request due to throttling.
    #[error("Rate limited")]
    RateLimited { retry_after_ms: Option<u64> },

    /// The service reported an internal failure.
    #[error("Server error (status {status})")]
    Server { status: u16 },

    /// A structured, service-defined error code. Wins over all other
    /// classification signals.
    #[error("Service error {code}: {message}")]
    Service { code: String, message: String },

    /// Anything else; classified by message substrings as a last resort.
    #[error("{0}")]
    Other(String),
}

// ============================================================================
// Wire Payload
// ============================================================================

/// Structured parse result from the remote service.
///
/// Datetimes arrive as ISO-8601 strings and are only interpreted during
/// conversion; nothing here is trusted until it has passed assessment and
/// sanitization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RemoteParse {
    pub title: Option<String>,
    pub start_datetime: Option<String>,
    pub end_datetime: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    /// Overall confidence reported by the service (0.0-1.0).
    pub confidence_score: f32,
    pub all_day: bool,
    /// IANA timezone identifier.
    pub timezone: Option<String>,
    /// Optional per-field confidence/source, keyed by wire field name.
    pub fields: HashMap<String, RemoteFieldSignal>,
}

/// Per-field signal on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RemoteFieldSignal {
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl RemoteParse {
    /// Core fields the pipeline needs before a parse counts as usable.
    pub fn missing_core_fields(&self) -> Vec<EventField> {
        let mut missing = Vec::new();
        if self.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
            missing.push(EventField::Title);
        }
        if self.start_datetime.is_none() {
            missing.push(EventField::StartTime);
        }
        missing
    }

    /// Convert the wire payload into an event draft.
    ///
    /// Unparseable datetimes become warnings rather than failures; the
    /// sanitizer fills safe defaults downstream.
    pub fn into_draft(self, raw_text: &str) -> EventDraft {
        let mut draft = EventDraft::new(
            self.title.clone().unwrap_or_default(),
            raw_text.to_string(),
        )
        .with_confidence(self.confidence_score)
        .with_timezone(self.timezone.clone().unwrap_or_else(|| "UTC".to_string()));

        if self.all_day {
            draft = draft.all_day_event();
        }
        if let Some(location) = self.location.clone() {
            draft = draft.with_location(location);
        }
        if let Some(description) = self.description.clone() {
            draft = draft.with_description(description);
        }

        if let Some(raw) = self.start_datetime.as_deref() {
            match parse_timestamp(raw) {
                Some(start) => draft = draft.with_start(start),
                None => {
                    draft = draft
                        .with_warning(format!("unparseable start datetime: {raw}"));
                }
            }
        }
        if let Some(raw) = self.end_datetime.as_deref() {
            match parse_timestamp(raw) {
                Some(end) => draft = draft.with_end(end),
                None => {
                    draft = draft.with_warning(format!("unparseable end datetime: {raw}"));
                }
            }
        }

        for field in EventField::ALL {
            let present = match field {
                EventField::Title => !draft.title.is_empty(),
                EventField::StartTime => draft.start.is_some(),
                EventField::EndTime => draft.end.is_some(),
                EventField::Location => draft.location.is_some(),
                EventField::Description => !draft.description.is_empty(),
            };
            if !present {
                continue;
            }
            let confidence = self
                .fields
                .get(wire_name(field))
                .map(|s| s.confidence)
                .unwrap_or(self.confidence_score);
            draft = draft.with_field_signal(
                field,
                FieldSignal::new(confidence, FieldSource::RemoteParse),
            );
        }

        draft
    }
}

fn wire_name(field: EventField) -> &'static str {
    match field {
        EventField::Title => "title",
        EventField::StartTime => "start_datetime",
        EventField::EndTime => "end_datetime",
        EventField::Location => "location",
        EventField::Description => "description",
    }
}
