//! Final validation and repair pass before an event leaves the engine.
//!
//! The sanitizer never rejects an event outright. Every field is coerced
//! into its documented bounds and every substitution is recorded, so the
//! caller can always launch something and can always see what was changed.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, Duration, Timelike, Utc};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::event::{EventDraft, EventField};

/// Title length bounds after sanitization.
const TITLE_MAX_LEN: usize = 200;
/// Location length bound after sanitization.
const LOCATION_MAX_LEN: usize = 500;
/// Description length bound after sanitization.
const DESCRIPTION_MAX_LEN: usize = 5000;
/// Title used when neither the draft nor the original text yields one.
const LAST_RESORT_TITLE: &str = "Untitled Event";

static WHITESPACE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid regex"));

// ============================================================================
// Outcome Types
// ============================================================================

/// Severity of a recorded substitution or finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Error,
    Warning,
    Info,
}

/// One substitution or finding from the sanitization pass.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ValidationIssue {
    /// Field the issue applies to.
    pub field: EventField,
    /// How serious the finding is.
    pub severity: IssueSeverity,
    /// Stable machine-readable code.
    pub code: String,
    /// Human-readable explanation.
    pub message: String,
    /// Value before the substitution, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    /// Value after the substitution, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

/// Result of a full validate-and-sanitize pass.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ValidationOutcome {
    /// True when no error-severity issues were recorded.
    pub valid: bool,
    /// The repaired event, always within documented bounds.
    pub sanitized: EventDraft,
    /// Every substitution and finding, in application order.
    pub issues: Vec<ValidationIssue>,
    /// Defaults that were synthesized, keyed by field.
    pub applied_defaults: HashMap<EventField, String>,
    /// Data integrity score in [0, 1], scaled by event confidence.
    pub integrity: f32,
}

// ============================================================================
// Sanitizer
// ============================================================================

/// Validates and repairs event drafts.
pub struct DataSanitizer {
    default_duration: Duration,
}

impl Default for DataSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl DataSanitizer {
    pub fn new() -> Self {
        Self {
            default_duration: Duration::minutes(60),
        }
    }

    /// Set the duration used when an end time must be synthesized.
    pub fn with_default_duration(mut self, minutes: u32) -> Self {
        self.default_duration = Duration::minutes(minutes as i64);
        self
    }

    /// Repair every field of the draft and record what changed.
    ///
    /// Running the pass on its own output produces no further changes.
    pub fn validate_and_sanitize(
        &self,
        draft: &EventDraft,
        original_text: &str,
    ) -> ValidationOutcome {
        let mut sanitized = draft.clone();
        let mut issues = Vec::new();
        let mut applied_defaults = HashMap::new();

        self.sanitize_title(&mut sanitized, original_text, &mut issues, &mut applied_defaults);
        self.sanitize_timestamps(&mut sanitized, &mut issues, &mut applied_defaults);
        self.sanitize_location(&mut sanitized, &mut issues);
        self.sanitize_description(
            &mut sanitized,
            original_text,
            &mut issues,
            &mut applied_defaults,
        );

        let errors = count_severity(&issues, IssueSeverity::Error);
        let warnings = count_severity(&issues, IssueSeverity::Warning);
        let infos = count_severity(&issues, IssueSeverity::Info);
        let penalty =
            1.0 - 0.3 * errors as f32 - 0.1 * warnings as f32 - 0.02 * infos as f32;
        let integrity = penalty.clamp(0.0, 1.0) * sanitized.confidence;

        ValidationOutcome {
            valid: errors == 0,
            sanitized,
            issues,
            applied_defaults,
            integrity,
        }
    }

    fn sanitize_title(
        &self,
        draft: &mut EventDraft,
        original_text: &str,
        issues: &mut Vec<ValidationIssue>,
        applied_defaults: &mut HashMap<EventField, String>,
    ) {
        let original = draft.title.clone();
        let mut cleaned = clean_title_text(&original);

        if cleaned.is_empty() {
            let (synthesized, severity) = synthesize_title(original_text);
            issues.push(ValidationIssue {
                field: EventField::Title,
                severity,
                code: "title_defaulted".to_string(),
                message: "Title was empty; a default was synthesized".to_string(),
                before: Some(original.clone()),
                after: Some(synthesized.clone()),
            });
            applied_defaults.insert(EventField::Title, synthesized.clone());
            cleaned = synthesized;
        } else if cleaned.chars().count() > TITLE_MAX_LEN {
            let truncated: String = cleaned.chars().take(TITLE_MAX_LEN - 3).collect();
            let truncated = truncated + "...";
            issues.push(ValidationIssue {
                field: EventField::Title,
                severity: IssueSeverity::Warning,
                code: "title_truncated".to_string(),
                message: format!("Title exceeded {TITLE_MAX_LEN} characters"),
                before: Some(cleaned.clone()),
                after: Some(truncated.clone()),
            });
            cleaned = truncated;
        } else if cleaned != original {
            issues.push(ValidationIssue {
                field: EventField::Title,
                severity: IssueSeverity::Info,
                code: "title_normalized".to_string(),
                message: "Title whitespace or punctuation was normalized".to_string(),
                before: Some(original.clone()),
                after: Some(cleaned.clone()),
            });
        }

        draft.title = cleaned;
    }

    fn sanitize_timestamps(
        &self,
        draft: &mut EventDraft,
        issues: &mut Vec<ValidationIssue>,
        applied_defaults: &mut HashMap<EventField, String>,
    ) {
        if draft.start.is_none() {
            let start = default_start(Utc::now());
            issues.push(ValidationIssue {
                field: EventField::StartTime,
                severity: IssueSeverity::Warning,
                code: "start_defaulted".to_string(),
                message: "Start time was missing; defaulted to the next hour".to_string(),
                before: None,
                after: Some(start.to_rfc3339()),
            });
            applied_defaults.insert(EventField::StartTime, start.to_rfc3339());
            draft.start = Some(start);
        }

        // start is Some from here on.
        let start = match draft.start {
            Some(start) => start,
            None => return,
        };

        match draft.end {
            None => {
                let end = start + self.default_duration;
                issues.push(ValidationIssue {
                    field: EventField::EndTime,
                    severity: IssueSeverity::Info,
                    code: "end_defaulted".to_string(),
                    message: "End time was missing; defaulted from duration".to_string(),
                    before: None,
                    after: Some(end.to_rfc3339()),
                });
                applied_defaults.insert(EventField::EndTime, end.to_rfc3339());
                draft.end = Some(end);
            }
            Some(end) if end <= start => {
                let regenerated = start + self.default_duration;
                issues.push(ValidationIssue {
                    field: EventField::EndTime,
                    severity: IssueSeverity::Warning,
                    code: "end_regenerated".to_string(),
                    message: "End time was not after start; regenerated".to_string(),
                    before: Some(end.to_rfc3339()),
                    after: Some(regenerated.to_rfc3339()),
                });
                draft.end = Some(regenerated);
            }
            Some(end) => {
                let duration = end - start;
                if duration < Duration::minutes(1) || duration > Duration::weeks(1) {
                    issues.push(ValidationIssue {
                        field: EventField::EndTime,
                        severity: IssueSeverity::Warning,
                        code: "duration_out_of_range".to_string(),
                        message: format!(
                            "Duration of {} minutes is outside the expected range",
                            duration.num_minutes()
                        ),
                        before: None,
                        after: None,
                    });
                }
            }
        }
    }

    fn sanitize_location(&self, draft: &mut EventDraft, issues: &mut Vec<ValidationIssue>) {
        let Some(original) = draft.location.clone() else {
            return;
        };

        let stripped = strip_control(&original, false);
        let mut cleaned = WHITESPACE_PATTERN
            .replace_all(&stripped, " ")
            .trim()
            .to_string();

        if cleaned.is_empty() {
            issues.push(ValidationIssue {
                field: EventField::Location,
                severity: IssueSeverity::Info,
                code: "location_removed".to_string(),
                message: "Location was empty after cleanup".to_string(),
                before: Some(original),
                after: None,
            });
            draft.location = None;
            return;
        }

        if cleaned.chars().count() > LOCATION_MAX_LEN {
            let truncated: String = cleaned.chars().take(LOCATION_MAX_LEN).collect();
            issues.push(ValidationIssue {
                field: EventField::Location,
                severity: IssueSeverity::Warning,
                code: "location_truncated".to_string(),
                message: format!("Location exceeded {LOCATION_MAX_LEN} characters"),
                before: Some(cleaned.clone()),
                after: Some(truncated.clone()),
            });
            cleaned = truncated;
        } else if cleaned != original {
            issues.push(ValidationIssue {
                field: EventField::Location,
                severity: IssueSeverity::Info,
                code: "location_normalized".to_string(),
                message: "Location whitespace was normalized".to_string(),
                before: Some(original),
                after: Some(cleaned.clone()),
            });
        }

        draft.location = Some(cleaned);
    }

    fn sanitize_description(
        &self,
        draft: &mut EventDraft,
        original_text: &str,
        issues: &mut Vec<ValidationIssue>,
        applied_defaults: &mut HashMap<EventField, String>,
    ) {
        let original = draft.description.clone();
        let mut cleaned = strip_control(&original, true).trim().to_string();

        if cleaned.is_empty() && !original_text.trim().is_empty() {
            let synthesized = quoted_original(original_text);
            issues.push(ValidationIssue {
                field: EventField::Description,
                severity: IssueSeverity::Info,
                code: "description_defaulted".to_string(),
                message: "Description defaulted to the original request text".to_string(),
                before: None,
                after: Some(synthesized.clone()),
            });
            applied_defaults.insert(EventField::Description, synthesized.clone());
            cleaned = synthesized;
        } else if cleaned.chars().count() > DESCRIPTION_MAX_LEN {
            let truncated: String = cleaned.chars().take(DESCRIPTION_MAX_LEN).collect();
            issues.push(ValidationIssue {
                field: EventField::Description,
                severity: IssueSeverity::Warning,
                code: "description_truncated".to_string(),
                message: format!("Description exceeded {DESCRIPTION_MAX_LEN} characters"),
                before: Some(cleaned.clone()),
                after: Some(truncated.clone()),
            });
            cleaned = truncated;
        } else if cleaned != original {
            issues.push(ValidationIssue {
                field: EventField::Description,
                severity: IssueSeverity::Info,
                code: "description_normalized".to_string(),
                message: "Description control characters were removed".to_string(),
                before: Some(original),
                after: Some(cleaned.clone()),
            });
        }

        draft.description = cleaned;
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn count_severity(issues: &[ValidationIssue], severity: IssueSeverity) -> usize {
    issues.iter().filter(|i| i.severity == severity).count()
}

fn strip_control(text: &str, keep_newlines: bool) -> String {
    text.chars()
        .filter(|c| !c.is_control() || (keep_newlines && *c == '\n'))
        .collect()
}

/// Strip control characters, collapse whitespace, and trim edge junk.
///
/// Trailing sentence punctuation is kept so a previously truncated title
/// ("...") survives a second pass unchanged.
fn clean_title_text(raw: &str) -> String {
    let stripped = strip_control(raw, false);
    let collapsed = WHITESPACE_PATTERN.replace_all(&stripped, " ");
    collapsed
        .trim()
        .trim_start_matches(['.', ',', ';', ':', '!', '?', '-', '*', '#'])
        .trim_end_matches([',', ';', ':', '-', '*', '#'])
        .trim()
        .to_string()
}

/// Build a title from the original text: first sentence, else first 50 chars.
fn synthesize_title(original_text: &str) -> (String, IssueSeverity) {
    let cleaned = clean_title_text(original_text);
    if cleaned.is_empty() {
        return (LAST_RESORT_TITLE.to_string(), IssueSeverity::Error);
    }

    let first_sentence = cleaned
        .split(['.', '!', '?'])
        .next()
        .unwrap_or(&cleaned)
        .trim();
    let candidate = if first_sentence.is_empty() {
        &cleaned
    } else {
        first_sentence
    };

    if candidate.chars().count() <= 50 {
        (candidate.to_string(), IssueSeverity::Warning)
    } else {
        let prefix: String = candidate.chars().take(50).collect();
        (prefix.trim_end().to_string(), IssueSeverity::Warning)
    }
}

fn quoted_original(original_text: &str) -> String {
    let trimmed = original_text.trim();
    let capped: String = trimmed.chars().take(DESCRIPTION_MAX_LEN - 20).collect();
    format!("Created from: \"{capped}\"")
}

/// Default start time: one hour from now with minute and second zeroed.
fn default_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let next = now + Duration::hours(1);
    next.with_minute(0)
        .and_then(|d| d.with_second(0))
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn draft_with(title: &str) -> EventDraft {
        EventDraft::new(title.to_string(), "some request".to_string()).with_confidence(1.0)
    }

    #[test]
    fn test_title_normalization_records_issue() {
        let sanitizer = DataSanitizer::new();
        let outcome =
            sanitizer.validate_and_sanitize(&draft_with("  Team   sync!  "), "team sync");
        assert_eq!(outcome.sanitized.title, "Team sync!");
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.code == "title_normalized"));
        assert!(outcome.valid);
    }

    #[test]
    fn test_empty_title_synthesized_from_text() {
        let sanitizer = DataSanitizer::new();
        let outcome = sanitizer
            .validate_and_sanitize(&draft_with(""), "Lunch with Maria. Bring the slides.");
        assert_eq!(outcome.sanitized.title, "Lunch with Maria");
        assert_eq!(
            outcome.applied_defaults.get(&EventField::Title),
            Some(&"Lunch with Maria".to_string())
        );
        assert!(outcome.valid);
    }

    #[test]
    fn test_empty_everything_is_invalid_but_repaired() {
        let sanitizer = DataSanitizer::new();
        let outcome = sanitizer.validate_and_sanitize(&draft_with(""), "");
        assert_eq!(outcome.sanitized.title, LAST_RESORT_TITLE);
        assert!(!outcome.valid);
    }

    #[test]
    fn test_long_title_truncated_to_bound() {
        let sanitizer = DataSanitizer::new();
        let long = "a".repeat(300);
        let outcome = sanitizer.validate_and_sanitize(&draft_with(&long), "text");
        assert_eq!(outcome.sanitized.title.chars().count(), TITLE_MAX_LEN);
        assert!(outcome.sanitized.title.ends_with("..."));
    }

    #[test]
    fn test_missing_timestamps_defaulted() {
        let sanitizer = DataSanitizer::new();
        let outcome = sanitizer.validate_and_sanitize(&draft_with("Call"), "call");
        let sanitized = &outcome.sanitized;
        assert!(sanitized.has_timestamps());
        let start = sanitized.start.unwrap();
        assert_eq!((start.minute(), start.second()), (0, 0));
        assert_eq!(
            sanitized.end.unwrap() - start,
            Duration::minutes(60)
        );
    }

    #[test]
    fn test_end_before_start_regenerated() {
        let sanitizer = DataSanitizer::new();
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 2, 13, 0, 0).unwrap();
        let draft = draft_with("Review").with_start(start).with_end(end);
        let outcome = sanitizer.validate_and_sanitize(&draft, "review");
        assert_eq!(outcome.sanitized.end.unwrap(), start + Duration::minutes(60));
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.code == "end_regenerated"));
    }

    #[test]
    fn test_extreme_duration_flagged_not_failed() {
        let sanitizer = DataSanitizer::new();
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap();
        let end = start + Duration::weeks(3);
        let draft = draft_with("Conference").with_start(start).with_end(end);
        let outcome = sanitizer.validate_and_sanitize(&draft, "conference");
        assert!(outcome.valid);
        assert_eq!(outcome.sanitized.end, Some(end));
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.code == "duration_out_of_range"));
    }

    #[test]
    fn test_empty_location_collapses_to_none() {
        let sanitizer = DataSanitizer::new();
        let draft = draft_with("Walk").with_location("   ".to_string());
        let outcome = sanitizer.validate_and_sanitize(&draft, "walk");
        assert!(outcome.sanitized.location.is_none());
    }

    #[test]
    fn test_description_defaults_to_quoted_original() {
        let sanitizer = DataSanitizer::new();
        let outcome =
            sanitizer.validate_and_sanitize(&draft_with("Dinner"), "dinner at 7");
        assert_eq!(
            outcome.sanitized.description,
            "Created from: \"dinner at 7\""
        );
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let sanitizer = DataSanitizer::new();
        let long = "b".repeat(300);
        let draft = draft_with(&long).with_description("line one\r\nline two".to_string());
        let first = sanitizer.validate_and_sanitize(&draft, "original request");
        let second = sanitizer.validate_and_sanitize(&first.sanitized, "original request");
        assert_eq!(first.sanitized.title, second.sanitized.title);
        assert_eq!(first.sanitized.end, second.sanitized.end);
        assert_eq!(
            first.sanitized.description,
            second.sanitized.description
        );
        assert!(second.issues.is_empty());
    }

    #[test]
    fn test_integrity_scales_with_issues() {
        let sanitizer = DataSanitizer::new();
        let clean = draft_with("Perfect title")
            .with_start(Utc.with_ymd_and_hms(2027, 1, 1, 10, 0, 0).unwrap())
            .with_end(Utc.with_ymd_and_hms(2027, 1, 1, 11, 0, 0).unwrap())
            .with_description("already described".to_string());
        let pristine = sanitizer.validate_and_sanitize(&clean, "text");
        assert!((pristine.integrity - 1.0).abs() < f32::EPSILON);

        let messy = sanitizer.validate_and_sanitize(&draft_with(""), "");
        assert!(messy.integrity < pristine.integrity);
    }
}
