//! Improvement suggestions for uncertain or incomplete events.
//!
//! Suggestions are generated per missing or low-confidence field plus a
//! few whole-text checks, deduplicated by kind, ranked by priority, and
//! capped so the caller never has to page through advice.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::event::{EventDraft, EventField};
use crate::fallback::{has_clock_time, has_day_cue, has_duration_cue};
use crate::preprocess::preprocess;

/// Upper bound on returned suggestions.
const MAX_SUGGESTIONS: usize = 5;
/// Texts shorter than this rarely carry enough signal.
const SHORT_TEXT_CHARS: usize = 15;

/// Relative day words that are ambiguous without a clock time.
static RELATIVE_DAY_WORDS: &[&str] = &[
    "today", "tomorrow", "tonight", "next", "this weekend", "later",
];

/// What kind of improvement a suggestion asks for. One suggestion per kind.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    AddSpecificTime,
    AddDate,
    ClarifyTitle,
    DisambiguateTime,
    AddDuration,
    AddLocation,
    ExpandText,
}

/// A single ranked improvement suggestion.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ImprovementSuggestion {
    pub kind: SuggestionKind,
    pub message: String,
    /// Higher means more impactful; used for ranking.
    pub priority: u8,
}

impl ImprovementSuggestion {
    fn new(kind: SuggestionKind, message: impl Into<String>, priority: u8) -> Self {
        Self {
            kind,
            message: message.into(),
            priority,
        }
    }
}

/// Generate ranked, deduplicated suggestions for a draft.
pub fn generate_suggestions(
    draft: &EventDraft,
    original_text: &str,
    missing_critical: &[EventField],
    low_confidence: &[EventField],
) -> Vec<ImprovementSuggestion> {
    let processed = preprocess(original_text);
    let lower = processed.to_lowercase();
    let mut suggestions = Vec::new();

    let time_uncertain = missing_critical.contains(&EventField::StartTime)
        || low_confidence.contains(&EventField::StartTime);
    if time_uncertain && !has_clock_time(&lower) {
        suggestions.push(ImprovementSuggestion::new(
            SuggestionKind::AddSpecificTime,
            "Add a specific time, like \"at 2pm\"",
            5,
        ));
    }
    if draft.start.is_none() && !has_day_cue(&lower) {
        suggestions.push(ImprovementSuggestion::new(
            SuggestionKind::AddDate,
            "Mention a day, like \"tomorrow\" or \"on friday\"",
            4,
        ));
    }
    if missing_critical.contains(&EventField::Title)
        || low_confidence.contains(&EventField::Title)
    {
        suggestions.push(ImprovementSuggestion::new(
            SuggestionKind::ClarifyTitle,
            "Describe what the event is, like \"lunch with Sam\"",
            4,
        ));
    }

    let has_relative_day = RELATIVE_DAY_WORDS.iter().any(|w| lower.contains(w));
    if has_relative_day && !has_clock_time(&lower) {
        suggestions.push(ImprovementSuggestion::new(
            SuggestionKind::DisambiguateTime,
            "A day word without a clock time is ambiguous; add one, like \"tomorrow at 10am\"",
            3,
        ));
    }
    if processed.chars().count() < SHORT_TEXT_CHARS {
        suggestions.push(ImprovementSuggestion::new(
            SuggestionKind::ExpandText,
            "Add more detail; very short requests are hard to interpret",
            3,
        ));
    }
    if draft.end.is_none() && !has_duration_cue(&lower) {
        suggestions.push(ImprovementSuggestion::new(
            SuggestionKind::AddDuration,
            "Mention how long it runs, like \"for 30 minutes\"",
            2,
        ));
    }
    if draft.location.is_none() {
        suggestions.push(ImprovementSuggestion::new(
            SuggestionKind::AddLocation,
            "Add a place if one matters, like \"at the office\"",
            1,
        ));
    }

    dedup_rank_cap(suggestions)
}

/// Keep one suggestion per kind, rank by priority, cap the list.
fn dedup_rank_cap(mut suggestions: Vec<ImprovementSuggestion>) -> Vec<ImprovementSuggestion> {
    suggestions.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.kind.cmp(&b.kind))
    });
    let mut seen = std::collections::HashSet::new();
    suggestions.retain(|s| seen.insert(s.kind));
    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}
