//! Best-effort event synthesis from raw text and an optional partial parse.
//!
//! Generation never fails: the worst case is a generically titled event at
//! the next full hour. Output confidence is clamped to [0.1, 0.6] so a
//! synthesized event can never masquerade as a trusted parse.

use chrono::{DateTime, Utc};

use crate::event::{EventDraft, EventField, FieldSignal, FieldSource};
use crate::preprocess::preprocess;

use super::schedule::{plan_schedule, ScheduleMethod};
use super::title::{contains_event_keyword, extract_title, TitleMethod};

/// Reason attached when no strategy-specific reason overrides it.
const DEFAULT_REASON: &str = "synthesized locally from text heuristics";

/// A synthesized event plus how it was produced.
#[derive(Debug, Clone)]
pub struct FallbackEvent {
    /// The synthesized draft, confidence already applied.
    pub event: EventDraft,
    /// Overall confidence, always within [0.1, 0.6].
    pub confidence: f32,
    /// How the title was obtained.
    pub title_method: TitleMethod,
    /// How the schedule was derived.
    pub schedule_method: ScheduleMethod,
}

/// Synthesizes events from raw text when no trustworthy parse exists.
pub struct FallbackGenerator {
    /// Fixed reference time for deterministic output; `None` means now.
    reference_time: Option<DateTime<Utc>>,
}

impl Default for FallbackGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackGenerator {
    pub fn new() -> Self {
        Self {
            reference_time: None,
        }
    }

    /// Pin the reference time used for schedule synthesis.
    pub fn with_reference_time(mut self, now: DateTime<Utc>) -> Self {
        self.reference_time = Some(now);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        self.reference_time.unwrap_or_else(Utc::now)
    }

    /// Synthesize an event from raw text and an optional partial draft.
    pub fn generate(&self, raw_text: &str, partial: Option<&EventDraft>) -> FallbackEvent {
        let processed = preprocess(raw_text);
        let now = self.now();

        let (title, title_confidence, title_method) = match partial {
            Some(p) if non_trivial_title(&p.title) => {
                (p.title.clone(), 0.8, TitleMethod::PartialDraft)
            }
            _ => {
                let extraction = extract_title(&processed);
                (extraction.title, extraction.confidence, extraction.method)
            }
        };

        let plan = plan_schedule(
            &processed,
            partial.and_then(|p| p.start),
            partial.and_then(|p| p.end),
            now,
        );

        let clarity = text_clarity(&processed);
        let partial_bonus = if partial.is_some() { 0.3 } else { 0.0 };
        let confidence = (0.8
            * (0.4 * title_confidence
                + 0.3 * plan.confidence
                + 0.2 * clarity
                + 0.1 * partial_bonus))
            .clamp(0.1, 0.6);

        let description =
            build_description(raw_text, title_method, plan.method, partial);

        let title_source = match title_method {
            TitleMethod::PartialDraft => FieldSource::PartialDraft,
            TitleMethod::PatternRule => FieldSource::PatternRule,
            _ => FieldSource::Heuristic,
        };
        let schedule_source = match plan.method {
            ScheduleMethod::PartialDraft => FieldSource::PartialDraft,
            _ => FieldSource::Heuristic,
        };

        let mut draft = EventDraft::new(title, raw_text)
            .with_start(plan.start)
            .with_end(plan.end)
            .with_description(description)
            .with_confidence(confidence)
            .with_fallback_reason(DEFAULT_REASON)
            .with_field_signal(
                EventField::Title,
                FieldSignal::new(title_confidence, title_source),
            )
            .with_field_signal(
                EventField::StartTime,
                FieldSignal::new(plan.confidence, schedule_source),
            )
            .with_field_signal(
                EventField::EndTime,
                FieldSignal::new(plan.confidence * 0.9, schedule_source),
            );

        if let Some(partial) = partial {
            if let Some(location) = partial.location.clone() {
                draft = draft.with_location(location).with_field_signal(
                    EventField::Location,
                    FieldSignal::new(0.7, FieldSource::PartialDraft),
                );
            }
            if partial.all_day {
                draft = draft.all_day_event();
            }
            if partial.timezone != "UTC" {
                draft = draft.with_timezone(partial.timezone.clone());
            }
        }

        FallbackEvent {
            event: draft,
            confidence,
            title_method,
            schedule_method: plan.method,
        }
    }
}

/// A partial title counts only if it carries real signal.
fn non_trivial_title(title: &str) -> bool {
    let trimmed = title.trim();
    trimmed.chars().count() >= 3
        && !trimmed.eq_ignore_ascii_case("event")
        && !trimmed.eq_ignore_ascii_case("new event")
        && !trimmed.eq_ignore_ascii_case("untitled event")
}

/// Rough [0, 1] measure of how much usable signal the text carries.
fn text_clarity(processed: &str) -> f32 {
    if processed.is_empty() {
        return 0.0;
    }
    let chars = processed.chars().count();
    let words = processed.split_whitespace().count();
    let sentences = processed
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count();
    let plain = processed
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .count();

    let mut score: f32 = 0.5;
    if (10..=200).contains(&chars) {
        score += 0.2;
    } else if chars > 500 {
        score -= 0.2;
    }
    if (3..=30).contains(&words) {
        score += 0.1;
    }
    if sentences > 3 {
        score -= 0.1;
    }
    if (plain as f32 / chars as f32) < 0.7 {
        score -= 0.2;
    }
    if contains_event_keyword(processed) {
        score += 0.2;
    }
    score.clamp(0.0, 1.0)
}

/// The description is the one place the original text is kept verbatim.
fn build_description(
    raw_text: &str,
    title_method: TitleMethod,
    schedule_method: ScheduleMethod,
    partial: Option<&EventDraft>,
) -> String {
    let mut description = format!("Created from: \"{}\"", raw_text.trim());
    description.push_str(&format!(
        "\nExtraction: title via {}, schedule via {}",
        title_method.display_name(),
        schedule_method.display_name()
    ));

    if let Some(partial) = partial {
        description.push_str("\nPartial draft:");
        if !partial.title.is_empty() {
            description.push_str(&format!(" title=\"{}\"", partial.title));
        }
        if let Some(start) = partial.start {
            description.push_str(&format!(" start={}", start.to_rfc3339()));
        }
        if let Some(end) = partial.end {
            description.push_str(&format!(" end={}", end.to_rfc3339()));
        }
        if let Some(location) = &partial.location {
            description.push_str(&format!(" location=\"{location}\""));
        }
    }

    description
}
