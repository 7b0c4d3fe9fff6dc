//! Title extraction from raw text via an ordered pattern table.
//!
//! Rules are plain (matcher, template, tier) tuples evaluated top to
//! bottom; the first match wins. Anything the table cannot handle falls
//! back to the first sentence, then a raw prefix of the text.

use std::sync::LazyLock;

use regex::Regex;

/// How a title was obtained. Recorded in the event description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleMethod {
    /// Taken from a caller-supplied partial draft.
    PartialDraft,
    /// Produced by one of the pattern rules.
    PatternRule,
    /// First sentence of the text.
    FirstSentence,
    /// Leading characters of the text.
    TextPrefix,
    /// Nothing usable in the text at all.
    Generic,
}

impl TitleMethod {
    pub fn display_name(&self) -> &'static str {
        match self {
            TitleMethod::PartialDraft => "partial draft",
            TitleMethod::PatternRule => "pattern rule",
            TitleMethod::FirstSentence => "first sentence",
            TitleMethod::TextPrefix => "text prefix",
            TitleMethod::Generic => "generic",
        }
    }
}

/// An extracted title with its confidence and provenance.
#[derive(Debug, Clone)]
pub struct TitleExtraction {
    pub title: String,
    pub confidence: f32,
    pub method: TitleMethod,
}

/// Title used when the text yields nothing at all.
pub const GENERIC_TITLE: &str = "New Event";

/// Keywords that indicate the text is really about an event.
pub const EVENT_KEYWORDS: &[&str] = &[
    "meeting",
    "call",
    "sync",
    "standup",
    "review",
    "lunch",
    "dinner",
    "breakfast",
    "coffee",
    "appointment",
    "interview",
    "birthday",
    "party",
    "conference",
    "class",
    "workout",
    "wedding",
    "reminder",
];

/// Ordered (matcher, template, tier) rules; first match wins.
static TITLE_RULES: LazyLock<Vec<(Regex, &'static str, f32)>> = LazyLock::new(|| {
    let rules: Vec<(&str, &'static str, f32)> = vec![
        (
            r"(?i)\bmeeting\s+(?:with|about|for)\s+([^.!?,\n]{2,60})",
            "Meeting with ${1}",
            0.9,
        ),
        (
            r"(?i)\b(call|phone call|sync)\s+(?:with|to)\s+([^.!?,\n]{2,60})",
            "${1} with ${2}",
            0.85,
        ),
        (
            r"(?i)\b(lunch|dinner|breakfast|coffee)\s+with\s+([^.!?,\n]{2,60})",
            "${1} with ${2}",
            0.85,
        ),
        (
            r"(?i)\binterview\s+(?:with|at|for)\s+([^.!?,\n]{2,60})",
            "Interview with ${1}",
            0.85,
        ),
        (
            r"(?i)\b(\w+)\s+appointment\b",
            "${1} appointment",
            0.8,
        ),
        (
            r"(?i)\b([\w\s]{2,30}?)(?:'s)?\s+birthday\b",
            "${1}'s birthday",
            0.8,
        ),
        (
            r"(?i)\b(?:schedule|plan)\s+(?:a\s+|an\s+|the\s+)?([^.!?,\n]{2,60})",
            "${1}",
            0.75,
        ),
        (
            r"(?i)\bremind(?:er)?\s+(?:me\s+)?to\s+([^.!?,\n]{2,60})",
            "${1}",
            0.75,
        ),
        (r"(?i)\b(appointment|interview)\b", "${1}", 0.6),
    ];
    rules
        .into_iter()
        .map(|(pattern, template, tier)| {
            (Regex::new(pattern).expect("Invalid regex"), template, tier)
        })
        .collect()
});

/// Everything from the first temporal token onward is schedule, not title.
static TEMPORAL_TAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\s+(?:at|on|next|this|today|tomorrow|tonight|noon|midnight|morning|afternoon|evening|night|monday|tuesday|wednesday|thursday|friday|saturday|sunday|\d{1,2}:\d{2}|\d{1,2}\s*(?:am|pm))\b.*$",
    )
    .expect("Invalid regex")
});

/// Extract a title from preprocessed text.
pub fn extract_title(processed: &str) -> TitleExtraction {
    for (pattern, template, tier) in TITLE_RULES.iter() {
        if let Some(captures) = pattern.captures(processed) {
            let mut expanded = String::new();
            captures.expand(template, &mut expanded);
            let title = polish_title(&expanded);
            if title.is_empty() {
                continue;
            }
            return TitleExtraction {
                confidence: (tier * length_adjustment(&title)).clamp(0.0, 1.0),
                title,
                method: TitleMethod::PatternRule,
            };
        }
    }

    extract_unstructured(processed)
}

/// First sentence, else first ~50 characters, else a generic title.
fn extract_unstructured(processed: &str) -> TitleExtraction {
    let first_sentence = processed
        .split(['.', '!', '?', '\n'])
        .map(str::trim)
        .find(|s| !s.is_empty());

    let (candidate, method) = match first_sentence {
        Some(sentence) if sentence.chars().count() <= 100 => {
            (polish_title(sentence), TitleMethod::FirstSentence)
        }
        Some(sentence) => {
            let prefix: String = sentence.chars().take(50).collect();
            (polish_title(prefix.trim_end()), TitleMethod::TextPrefix)
        }
        None => (String::new(), TitleMethod::Generic),
    };

    if candidate.is_empty() {
        return TitleExtraction {
            title: GENERIC_TITLE.to_string(),
            confidence: 0.15,
            method: TitleMethod::Generic,
        };
    }

    // Shorter extraction relative to the input means more signal per char.
    let input_len = processed.chars().count().max(1);
    let compression = 1.0 - (candidate.chars().count() as f32 / input_len as f32);
    let keyword_boost = if contains_event_keyword(processed) {
        0.1
    } else {
        0.0
    };
    let confidence = (0.25 + 0.15 * compression.clamp(0.0, 1.0) + keyword_boost).min(0.55);

    TitleExtraction {
        title: candidate,
        confidence,
        method,
    }
}

/// Trim the temporal tail, tidy edges, and capitalize the first letter.
fn polish_title(raw: &str) -> String {
    let cut = TEMPORAL_TAIL_PATTERN.replace(raw, "");
    let trimmed = cut
        .trim()
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
        .trim();
    let mut cleaned = trimmed.to_string();

    if let Some(first) = cleaned.chars().next() {
        cleaned = first.to_uppercase().to_string() + &cleaned[first.len_utf8()..];
    }

    cleaned
}

fn length_adjustment(title: &str) -> f32 {
    let words = title.split_whitespace().count();
    let chars = title.chars().count();
    if chars < 5 || words < 2 {
        0.75
    } else if chars > 60 || words > 10 {
        0.85
    } else {
        1.0
    }
}

pub fn contains_event_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    EVENT_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meeting_rule_strips_temporal_tail() {
        let extraction = extract_title("meeting with John tomorrow at 2pm");
        assert_eq!(extraction.title, "Meeting with John");
        assert_eq!(extraction.method, TitleMethod::PatternRule);
        assert!(extraction.confidence >= 0.8);
    }

    #[test]
    fn test_meal_rule_captures_both_parts() {
        let extraction = extract_title("lunch with Maria at Cafe Luna");
        assert_eq!(extraction.title, "Lunch with Maria");
    }

    #[test]
    fn test_reminder_rule() {
        let extraction = extract_title("remind me to submit the report friday");
        assert_eq!(extraction.title, "Submit the report");
    }

    #[test]
    fn test_birthday_rule() {
        let extraction = extract_title("sam's birthday next saturday");
        assert_eq!(extraction.title, "Sam's birthday");
    }

    #[test]
    fn test_first_match_wins_over_later_rules() {
        // Both the meeting rule and the bare-keyword rule could match.
        let extraction = extract_title("meeting with the interview panel");
        assert_eq!(extraction.title, "Meeting with the interview panel");
    }

    #[test]
    fn test_no_match_uses_first_sentence() {
        let extraction = extract_title("Quarterly numbers review. Then drinks.");
        assert_eq!(extraction.method, TitleMethod::FirstSentence);
        assert_eq!(extraction.title, "Quarterly numbers review");
        assert!(extraction.confidence < 0.6);
    }

    #[test]
    fn test_empty_text_yields_generic_title() {
        let extraction = extract_title("");
        assert_eq!(extraction.title, GENERIC_TITLE);
        assert_eq!(extraction.method, TitleMethod::Generic);
    }

    #[test]
    fn test_lower_tier_rule_scores_below_meeting_rule() {
        let appointment = extract_title("dentist appointment");
        let meeting = extract_title("meeting with Alice Johnson");
        assert!(appointment.confidence < meeting.confidence);
    }
}
