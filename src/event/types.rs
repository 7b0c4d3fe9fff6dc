//! Event draft types flowing through the recovery pipeline.
//!
//! An [`EventDraft`] is the universal result record: it starts life as a
//! remote parse or a heuristic fallback, then passes through confidence
//! assessment and sanitization. Stages return new copies; a draft is never
//! mutated in place once produced.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ============================================================================
// Event Draft
// ============================================================================

/// A calendar event draft with per-field provenance and confidence.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EventDraft {
    /// Event title.
    pub title: String,
    /// Start time (canonical UTC). Always `Some` once sanitized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    /// End time (canonical UTC). Strictly after `start` once sanitized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    /// Location of the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Event description.
    #[serde(default)]
    pub description: String,
    /// Overall confidence score (0.0-1.0).
    pub confidence: f32,
    /// Whether this is an all-day event.
    #[serde(default)]
    pub all_day: bool,
    /// IANA timezone identifier the times were interpreted in.
    pub timezone: String,
    /// Whether heuristic fallback produced this draft.
    #[serde(default)]
    pub fallback_applied: bool,
    /// Reason the fallback path was taken, when it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    /// Per-field confidence and source.
    #[serde(default)]
    pub fields: HashMap<EventField, FieldSignal>,
    /// Warnings accumulated while producing the draft.
    #[serde(default)]
    pub warnings: Vec<String>,
    /// The raw text this draft originated from.
    pub source_text: String,
}

impl EventDraft {
    /// Create a new draft for the given source text.
    pub fn new(title: impl Into<String>, source_text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            start: None,
            end: None,
            location: None,
            description: String::new(),
            confidence: 0.0,
            all_day: false,
            timezone: "UTC".to_string(),
            fallback_applied: false,
            fallback_reason: None,
            fields: HashMap::new(),
            warnings: Vec::new(),
            source_text: source_text.into(),
        }
    }

    /// Set the start time.
    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    /// Set the end time.
    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    /// Set the duration (calculates end from start).
    pub fn with_duration(mut self, duration: Duration) -> Self {
        if let Some(start) = self.start {
            self.end = Some(start + duration);
        }
        self
    }

    /// Set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the overall confidence, clamped to [0, 1].
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Mark as an all-day event.
    pub fn all_day_event(mut self) -> Self {
        self.all_day = true;
        self
    }

    /// Set the timezone identifier.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    /// Mark the draft as fallback-generated with a reason.
    pub fn with_fallback_reason(mut self, reason: impl Into<String>) -> Self {
        self.fallback_applied = true;
        self.fallback_reason = Some(reason.into());
        self
    }

    /// Record a per-field confidence and source.
    pub fn with_field_signal(mut self, field: EventField, signal: FieldSignal) -> Self {
        self.fields.insert(field, signal);
        self
    }

    /// Append a warning.
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Get the duration when both timestamps are present.
    pub fn duration(&self) -> Option<Duration> {
        match (self.start, self.end) {
            (Some(s), Some(e)) => Some(e - s),
            _ => None,
        }
    }

    /// Whether both timestamps are present.
    pub fn has_timestamps(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// The recorded confidence for a field, when present.
    pub fn field_confidence(&self, field: EventField) -> Option<f32> {
        self.fields.get(&field).map(|s| s.confidence)
    }
}

// ============================================================================
// Field Provenance
// ============================================================================

/// The event fields tracked individually through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventField {
    Title,
    StartTime,
    EndTime,
    Location,
    Description,
}

impl EventField {
    /// All tracked fields, in assessment weight order.
    pub const ALL: [EventField; 5] = [
        EventField::Title,
        EventField::StartTime,
        EventField::EndTime,
        EventField::Location,
        EventField::Description,
    ];

    /// Get a human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            EventField::Title => "title",
            EventField::StartTime => "start time",
            EventField::EndTime => "end time",
            EventField::Location => "location",
            EventField::Description => "description",
        }
    }
}

/// Where a field value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    /// Supplied by the remote text-understanding service.
    RemoteParse,
    /// Matched by an ordered title pattern rule.
    PatternRule,
    /// Derived from keyword/time heuristics.
    Heuristic,
    /// Carried over from a partial draft.
    PartialDraft,
    /// Filled in by the sanitizer as a safe default.
    Default,
}

/// Confidence and provenance for a single field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct FieldSignal {
    /// Confidence for this field (0.0-1.0).
    pub confidence: f32,
    /// Where the value came from.
    pub source: FieldSource,
}

impl FieldSignal {
    /// Create a signal, clamping confidence to [0, 1].
    pub fn new(confidence: f32, source: FieldSource) -> Self {
        Self {
            confidence: confidence.clamp(0.0, 1.0),
            source,
        }
    }
}
