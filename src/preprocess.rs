//! Text normalization applied before parsing and fallback extraction.
//!
//! Pure and stateless. Expands the shorthand people actually type
//! ("mtg w/ Sarah @ 2p tmrw") into canonical phrasing so downstream
//! pattern tables can stay small.

use std::sync::LazyLock;

use regex::Regex;

/// Ordered rewrite rules; earlier rules feed later ones.
static REWRITE_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    let rules: Vec<(&str, &'static str)> = vec![
        // Separator shorthand.
        (r"@", " at "),
        (r"(?i)\bw/\s*", "with "),
        // Meridiem normalization.
        (r"(?i)\ba\.m\.", "am"),
        (r"(?i)\bp\.m\.", "pm"),
        (r"(?i)\b(\d{1,2}(?::\d{2})?)\s*p\b", "${1}pm"),
        (r"(?i)\b(\d{1,2}(?::\d{2})?)\s*a\b", "${1}am"),
        // Day-of-week abbreviations.
        (r"(?i)\bmon\.?\b", "monday"),
        (r"(?i)\btues?\.?\b", "tuesday"),
        (r"(?i)\bwed\.?\b", "wednesday"),
        (r"(?i)\bthu(?:rs?)?\.?\b", "thursday"),
        (r"(?i)\bfri\.?\b", "friday"),
        (r"(?i)\bsat\.?\b", "saturday"),
        (r"(?i)\bsun\.?\b", "sunday"),
        // Phrasing shorthand.
        (r"(?i)\btmrw\b", "tomorrow"),
        (r"(?i)\bmtg\b", "meeting"),
        (r"(?i)\bappt\b", "appointment"),
        (r"(?i)\b(\d+)\s*hrs\b", "${1} hours"),
        (r"(?i)\b(\d+)\s*hr\b", "${1} hour"),
        (r"(?i)\b(\d+)\s*mins\b", "${1} minutes"),
        (r"(?i)\b(\d+)\s*min\b", "${1} minute"),
    ];
    rules
        .into_iter()
        .map(|(pattern, replacement)| {
            (Regex::new(pattern).expect("Invalid regex"), replacement)
        })
        .collect()
});

static WHITESPACE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid regex"));

/// Normalize raw input text for parsing and extraction.
pub fn preprocess(text: &str) -> String {
    let mut out = text.to_string();
    for (pattern, replacement) in REWRITE_RULES.iter() {
        out = pattern.replace_all(&out, *replacement).into_owned();
    }
    WHITESPACE_PATTERN.replace_all(&out, " ").trim().to_string()
}
