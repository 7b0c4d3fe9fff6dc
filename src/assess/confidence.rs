//! Field-by-field confidence assessment and the proceed/block ladder.

use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::event::{EventDraft, EventField};

use super::suggestions::{generate_suggestions, ImprovementSuggestion};

/// Below this, only manual entry makes sense.
const CRITICAL_THRESHOLD: f32 = 0.1;
/// Below this, the event needs improvement before use.
const MEDIUM_THRESHOLD: f32 = 0.3;
/// Below this, proceed but warn.
const HIGH_THRESHOLD: f32 = 0.7;
/// A field under this assessed confidence counts as low.
const LOW_FIELD_THRESHOLD: f32 = 0.5;
/// Data quality under this forces the improvement recommendation.
const LOW_QUALITY_THRESHOLD: f32 = 0.5;

/// Confidence placeholder for optional fields that are simply absent.
const NEUTRAL_CONFIDENCE: f32 = 0.5;

/// Blend weights for per-field confidences.
static FIELD_WEIGHTS: &[(EventField, f32)] = &[
    (EventField::Title, 0.30),
    (EventField::StartTime, 0.25),
    (EventField::EndTime, 0.15),
    (EventField::Location, 0.15),
    (EventField::Description, 0.15),
];

static GENERIC_TITLES: &[&str] = &["event", "new event", "untitled event", "meeting", "reminder"];

// ============================================================================
// Assessment Types
// ============================================================================

/// What the caller should do with the assessed event, least to most
/// restrictive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    ProceedConfidently,
    ProceedWithCaution,
    SuggestImprovements,
    ManualEntryRecommended,
    BlockCreation,
}

impl Recommendation {
    pub fn display_name(&self) -> &'static str {
        match self {
            Recommendation::ProceedConfidently => "proceed confidently",
            Recommendation::ProceedWithCaution => "proceed with caution",
            Recommendation::SuggestImprovements => "suggest improvements",
            Recommendation::ManualEntryRecommended => "manual entry recommended",
            Recommendation::BlockCreation => "block creation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WarningSeverity {
    Info,
    Caution,
    Severe,
}

/// User-facing caution attached to an assessment.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Warning {
    pub message: String,
    pub severity: WarningSeverity,
}

/// Per-field assessment detail.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FieldAssessment {
    pub field: EventField,
    /// Reported confidence scaled by quality, in [0, 1].
    pub confidence: f32,
    /// Quality multiplier accumulated from penalties, in [0, 1].
    pub quality: f32,
    /// Human-readable findings behind the penalties.
    pub issues: Vec<String>,
}

/// Full assessment of an event draft.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConfidenceAssessment {
    /// Blended overall confidence in [0, 1].
    pub overall: f32,
    pub fields: Vec<FieldAssessment>,
    pub recommendation: Recommendation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<Warning>,
    /// False only when the recommendation forbids creation.
    pub proceed: bool,
    /// Ranked improvement suggestions, at most five.
    pub suggestions: Vec<ImprovementSuggestion>,
    /// Mean of the per-field quality multipliers.
    pub data_quality: f32,
    pub missing_critical: Vec<EventField>,
    pub low_confidence: Vec<EventField>,
}

// ============================================================================
// Validator
// ============================================================================

/// Scores event drafts and derives a recommendation.
pub struct ConfidenceValidator {
    strict_mode: bool,
    /// Fixed reference time for deterministic output; `None` means now.
    reference_time: Option<DateTime<Utc>>,
}

impl Default for ConfidenceValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfidenceValidator {
    pub fn new() -> Self {
        Self {
            strict_mode: false,
            reference_time: None,
        }
    }

    /// In strict mode, missing critical fields block creation.
    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    /// Pin the reference time used for past/future checks.
    pub fn with_reference_time(mut self, now: DateTime<Utc>) -> Self {
        self.reference_time = Some(now);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        self.reference_time.unwrap_or_else(Utc::now)
    }

    /// Assess a draft field by field and derive the overall verdict.
    pub fn assess(&self, draft: &EventDraft, original_text: &str) -> ConfidenceAssessment {
        let now = self.now();
        let fields: Vec<FieldAssessment> = EventField::ALL
            .iter()
            .map(|field| self.assess_field(draft, *field, now))
            .collect();

        let weighted: f32 = FIELD_WEIGHTS
            .iter()
            .map(|(field, weight)| {
                fields
                    .iter()
                    .find(|f| f.field == *field)
                    .map(|f| f.confidence * weight)
                    .unwrap_or(0.0)
            })
            .sum();
        let overall = (0.7 * draft.confidence + 0.3 * weighted).clamp(0.0, 1.0);

        let data_quality =
            fields.iter().map(|f| f.quality).sum::<f32>() / fields.len() as f32;

        let mut missing_critical = Vec::new();
        if draft.title.trim().is_empty() {
            missing_critical.push(EventField::Title);
        }
        if draft.start.is_none() {
            missing_critical.push(EventField::StartTime);
        }

        let low_confidence: Vec<EventField> = fields
            .iter()
            .filter(|f| field_present(draft, f.field) && f.confidence < LOW_FIELD_THRESHOLD)
            .map(|f| f.field)
            .collect();

        let recommendation = if overall < CRITICAL_THRESHOLD {
            Recommendation::ManualEntryRecommended
        } else if self.strict_mode && !missing_critical.is_empty() {
            Recommendation::BlockCreation
        } else if overall < MEDIUM_THRESHOLD || data_quality < LOW_QUALITY_THRESHOLD {
            Recommendation::SuggestImprovements
        } else if overall < HIGH_THRESHOLD || !low_confidence.is_empty() {
            Recommendation::ProceedWithCaution
        } else {
            Recommendation::ProceedConfidently
        };

        let suggestions =
            generate_suggestions(draft, original_text, &missing_critical, &low_confidence);

        ConfidenceAssessment {
            overall,
            proceed: recommendation <= Recommendation::SuggestImprovements,
            warning: build_warning(recommendation, overall),
            recommendation,
            suggestions,
            data_quality,
            missing_critical,
            low_confidence,
            fields,
        }
    }

    fn assess_field(&self, draft: &EventDraft, field: EventField, now: DateTime<Utc>) -> FieldAssessment {
        match field {
            EventField::Title => assess_title(draft),
            EventField::StartTime => assess_start(draft, now),
            EventField::EndTime => assess_end(draft),
            EventField::Location => assess_location(draft),
            EventField::Description => assess_description(draft),
        }
    }
}

// ============================================================================
// Per-Field Scoring
// ============================================================================

fn reported_confidence(draft: &EventDraft, field: EventField) -> f32 {
    draft.field_confidence(field).unwrap_or(draft.confidence)
}

fn field_present(draft: &EventDraft, field: EventField) -> bool {
    match field {
        EventField::Title => !draft.title.trim().is_empty(),
        EventField::StartTime => draft.start.is_some(),
        EventField::EndTime => draft.end.is_some(),
        EventField::Location => draft.location.is_some(),
        EventField::Description => !draft.description.trim().is_empty(),
    }
}

fn assess_title(draft: &EventDraft) -> FieldAssessment {
    let title = draft.title.trim();
    if title.is_empty() {
        return FieldAssessment {
            field: EventField::Title,
            confidence: 0.0,
            quality: 0.0,
            issues: vec!["title is missing".to_string()],
        };
    }

    let mut quality: f32 = 1.0;
    let mut issues = Vec::new();
    let lower = title.to_lowercase();
    let chars = title.chars().count();

    if GENERIC_TITLES.contains(&lower.as_str()) {
        quality *= 0.5;
        issues.push("title is generic".to_string());
    }
    if chars < 5 {
        quality *= 0.7;
        issues.push("title is very short".to_string());
    } else if chars > 100 {
        quality *= 0.9;
        issues.push("title is unusually long".to_string());
    }
    if title
        .chars()
        .next()
        .map(|c| c.is_alphabetic() && c.is_lowercase())
        .unwrap_or(false)
    {
        quality *= 0.9;
        issues.push("title is not capitalized".to_string());
    }

    FieldAssessment {
        field: EventField::Title,
        confidence: (reported_confidence(draft, EventField::Title) * quality).clamp(0.0, 1.0),
        quality,
        issues,
    }
}

fn assess_start(draft: &EventDraft, now: DateTime<Utc>) -> FieldAssessment {
    let Some(start) = draft.start else {
        return FieldAssessment {
            field: EventField::StartTime,
            confidence: 0.0,
            quality: 0.0,
            issues: vec!["start time is missing".to_string()],
        };
    };

    let mut quality: f32 = 1.0;
    let mut issues = Vec::new();

    if start < now {
        quality *= 0.5;
        issues.push("start time is in the past".to_string());
    } else if start > now + Duration::days(730) {
        quality *= 0.8;
        issues.push("start time is unusually far in the future".to_string());
    }

    FieldAssessment {
        field: EventField::StartTime,
        confidence: (reported_confidence(draft, EventField::StartTime) * quality)
            .clamp(0.0, 1.0),
        quality,
        issues,
    }
}

fn assess_end(draft: &EventDraft) -> FieldAssessment {
    let Some(end) = draft.end else {
        return FieldAssessment {
            field: EventField::EndTime,
            confidence: (reported_confidence(draft, EventField::EndTime) * 0.5).clamp(0.0, 1.0),
            quality: 0.5,
            issues: vec!["end time is missing".to_string()],
        };
    };

    let mut quality: f32 = 1.0;
    let mut issues = Vec::new();

    if let Some(start) = draft.start {
        if end <= start {
            quality *= 0.3;
            issues.push("end time is not after start".to_string());
        }
    }

    FieldAssessment {
        field: EventField::EndTime,
        confidence: (reported_confidence(draft, EventField::EndTime) * quality).clamp(0.0, 1.0),
        quality,
        issues,
    }
}

fn assess_location(draft: &EventDraft) -> FieldAssessment {
    let Some(location) = &draft.location else {
        return FieldAssessment {
            field: EventField::Location,
            confidence: NEUTRAL_CONFIDENCE,
            quality: 1.0,
            issues: Vec::new(),
        };
    };

    let mut quality: f32 = 1.0;
    let mut issues = Vec::new();

    if location.chars().count() > 200 {
        quality *= 0.8;
        issues.push("location is unusually long".to_string());
    }

    FieldAssessment {
        field: EventField::Location,
        confidence: (reported_confidence(draft, EventField::Location) * quality)
            .clamp(0.0, 1.0),
        quality,
        issues,
    }
}

fn assess_description(draft: &EventDraft) -> FieldAssessment {
    let description = draft.description.trim();
    if description.is_empty() {
        return FieldAssessment {
            field: EventField::Description,
            confidence: NEUTRAL_CONFIDENCE,
            quality: 1.0,
            issues: Vec::new(),
        };
    }

    let mut quality: f32 = 1.0;
    let mut issues = Vec::new();

    if description.chars().count() < 10 {
        quality *= 0.9;
        issues.push("description is very short".to_string());
    }

    FieldAssessment {
        field: EventField::Description,
        confidence: (reported_confidence(draft, EventField::Description) * quality)
            .clamp(0.0, 1.0),
        quality,
        issues,
    }
}

fn build_warning(recommendation: Recommendation, overall: f32) -> Option<Warning> {
    match recommendation {
        Recommendation::ProceedConfidently => None,
        Recommendation::ProceedWithCaution => Some(Warning {
            message: format!(
                "Some event details may be imprecise (confidence {overall:.2}); review before saving"
            ),
            severity: WarningSeverity::Info,
        }),
        Recommendation::SuggestImprovements => Some(Warning {
            message: "Event details are uncertain; consider the suggested improvements"
                .to_string(),
            severity: WarningSeverity::Caution,
        }),
        Recommendation::ManualEntryRecommended => Some(Warning {
            message: "Too little was understood from the text; manual entry is recommended"
                .to_string(),
            severity: WarningSeverity::Severe,
        }),
        Recommendation::BlockCreation => Some(Warning {
            message: "Required event details are missing; creation is blocked".to_string(),
            severity: WarningSeverity::Severe,
        }),
    }
}
