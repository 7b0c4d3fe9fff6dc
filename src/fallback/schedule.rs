//! Schedule synthesis: start/end times from text cues.
//!
//! Resolution order: a partial-draft start is trusted outright; then
//! explicit clock times; then named time-of-day anchors; then day cues
//! alone; finally the next full hour. Weekday names are always searched
//! forward from the reference time, never backward.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc, Weekday};
use regex::Regex;

/// How the schedule was derived. Recorded in the event description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleMethod {
    /// Start taken from a caller-supplied partial draft.
    PartialDraft,
    /// Explicit clock time found in the text.
    ClockTime,
    /// Named time-of-day anchor ("dinner", "morning").
    TimeAnchor,
    /// Day cue only; anchored to the default morning hour.
    DayAnchor,
    /// No cues at all; next full hour.
    NextFullHour,
}

impl ScheduleMethod {
    pub fn display_name(&self) -> &'static str {
        match self {
            ScheduleMethod::PartialDraft => "partial draft",
            ScheduleMethod::ClockTime => "clock time",
            ScheduleMethod::TimeAnchor => "time-of-day anchor",
            ScheduleMethod::DayAnchor => "day anchor",
            ScheduleMethod::NextFullHour => "next full hour",
        }
    }
}

/// A synthesized start/end pair with its confidence and provenance.
#[derive(Debug, Clone)]
pub struct SchedulePlan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub confidence: f32,
    pub method: ScheduleMethod,
    pub duration_minutes: i64,
}

/// Hour used when a day cue appears without any time cue.
const DEFAULT_MORNING_HOUR: u32 = 9;

/// Named time-of-day anchors; first match wins, so longer names that
/// contain shorter ones ("afternoon"/"noon", "midnight"/"night") come first.
static TIME_ANCHORS: &[(&str, u32)] = &[
    ("breakfast", 8),
    ("afternoon", 14),
    ("midnight", 0),
    ("morning", 9),
    ("lunch", 12),
    ("dinner", 19),
    ("evening", 18),
    ("noon", 12),
    ("night", 21),
];

/// Relative day terms; longer phrases first.
static DAY_OFFSETS: &[(&str, i64)] = &[
    ("day after tomorrow", 2),
    ("tomorrow", 1),
    ("tonight", 0),
    ("today", 0),
];

static WEEKDAYS: &[(&str, Weekday)] = &[
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

/// Typical durations by event-type keyword, in minutes.
static EVENT_DURATIONS: &[(&str, i64)] = &[
    ("meeting", 60),
    ("lunch", 60),
    ("dinner", 90),
    ("coffee", 30),
    ("standup", 15),
    ("interview", 60),
    ("appointment", 30),
    ("wedding", 360),
    ("conference", 480),
    ("party", 180),
    ("workout", 60),
    ("class", 90),
];

/// Typical durations by start hour (inclusive ranges), in minutes.
static HOUR_DURATIONS: &[(u32, u32, i64)] = &[
    (6, 11, 30),
    (12, 13, 60),
    (14, 17, 60),
    (18, 21, 90),
];

static MERIDIEM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})(?::([0-5]\d))?\s*(am|pm)\b").expect("Invalid regex")
});

static CLOCK24_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([01]?\d|2[0-3]):([0-5]\d)\b").expect("Invalid regex"));

static EXPLICIT_HOURS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d+(?:\.\d+)?)\s*hours?\b").expect("Invalid regex"));

static EXPLICIT_MINUTES_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d+)\s*minutes?\b").expect("Invalid regex"));

#[derive(Debug, Clone, Copy)]
enum DayCue {
    Offset(i64),
    Day(Weekday),
}

/// Synthesize a start/end pair from preprocessed text.
pub fn plan_schedule(
    processed: &str,
    partial_start: Option<DateTime<Utc>>,
    partial_end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> SchedulePlan {
    let lower = processed.to_lowercase();

    if let Some(start) = partial_start {
        let end = match partial_end {
            Some(end) if end > start => end,
            _ => start + Duration::minutes(estimate_duration(&lower, start.hour())),
        };
        return SchedulePlan {
            start,
            end,
            confidence: 0.7,
            method: ScheduleMethod::PartialDraft,
            duration_minutes: (end - start).num_minutes(),
        };
    }

    let time = find_clock_time(&lower)
        .map(|(hour, minute)| (hour, minute, 0.6f32, ScheduleMethod::ClockTime))
        .or_else(|| {
            find_time_anchor(&lower).map(|hour| (hour, 0, 0.5, ScheduleMethod::TimeAnchor))
        });
    let day = find_day_cue(&lower);

    let (start, confidence, method) = match (day, time) {
        (Some(cue), Some((hour, minute, confidence, method))) => {
            let start = at_time(resolve_day(cue, now), hour, minute, now);
            (bump_past_weekday(start, cue, now), confidence, method)
        }
        (Some(cue), None) => {
            let start = at_time(resolve_day(cue, now), DEFAULT_MORNING_HOUR, 0, now);
            (
                bump_past_weekday(start, cue, now),
                0.4,
                ScheduleMethod::DayAnchor,
            )
        }
        (None, Some((hour, minute, confidence, method))) => {
            let mut start = at_time(now.date_naive(), hour, minute, now);
            if start <= now {
                start += Duration::days(1);
            }
            (start, confidence, method)
        }
        (None, None) => (next_full_hour(now), 0.2, ScheduleMethod::NextFullHour),
    };

    let duration_minutes = estimate_duration(&lower, start.hour());
    SchedulePlan {
        start,
        end: start + Duration::minutes(duration_minutes),
        confidence,
        method,
        duration_minutes,
    }
}

// ============================================================================
// Cue Detection
// ============================================================================

/// Whether the text carries an explicit clock time.
pub fn has_clock_time(text: &str) -> bool {
    find_clock_time(&text.to_lowercase()).is_some()
}

/// Whether the text carries any time cue, explicit or named.
pub fn has_time_cue(text: &str) -> bool {
    let lower = text.to_lowercase();
    find_clock_time(&lower).is_some() || find_time_anchor(&lower).is_some()
}

/// Whether the text carries a relative day or weekday cue.
pub fn has_day_cue(text: &str) -> bool {
    find_day_cue(&text.to_lowercase()).is_some()
}

/// Whether the text mentions an explicit duration.
pub fn has_duration_cue(text: &str) -> bool {
    let lower = text.to_lowercase();
    EXPLICIT_HOURS_PATTERN.is_match(&lower) || EXPLICIT_MINUTES_PATTERN.is_match(&lower)
}

fn find_clock_time(lower: &str) -> Option<(u32, u32)> {
    if let Some(captures) = MERIDIEM_PATTERN.captures(lower) {
        let hour_raw: u32 = captures.get(1)?.as_str().parse().ok()?;
        if (1..=12).contains(&hour_raw) {
            let minute = captures
                .get(2)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);
            let hour = match captures.get(3)?.as_str() {
                "pm" => hour_raw % 12 + 12,
                _ => hour_raw % 12,
            };
            return Some((hour, minute));
        }
    }
    if let Some(captures) = CLOCK24_PATTERN.captures(lower) {
        let hour = captures.get(1)?.as_str().parse().ok()?;
        let minute = captures.get(2)?.as_str().parse().ok()?;
        return Some((hour, minute));
    }
    None
}

fn find_time_anchor(lower: &str) -> Option<u32> {
    TIME_ANCHORS
        .iter()
        .find(|(name, _)| lower.contains(name))
        .map(|(_, hour)| *hour)
}

fn find_day_cue(lower: &str) -> Option<DayCue> {
    for (term, days) in DAY_OFFSETS {
        if lower.contains(term) {
            return Some(DayCue::Offset(*days));
        }
    }
    for (name, weekday) in WEEKDAYS {
        if lower.contains(name) {
            return Some(DayCue::Day(*weekday));
        }
    }
    None
}

// ============================================================================
// Resolution
// ============================================================================

fn resolve_day(cue: DayCue, now: DateTime<Utc>) -> NaiveDate {
    match cue {
        DayCue::Offset(days) => now.date_naive() + Duration::days(days),
        DayCue::Day(target) => {
            let current = now.date_naive().weekday().num_days_from_monday() as i64;
            let wanted = target.num_days_from_monday() as i64;
            now.date_naive() + Duration::days((wanted - current).rem_euclid(7))
        }
    }
}

/// A weekday resolving to earlier today still means the next occurrence.
fn bump_past_weekday(start: DateTime<Utc>, cue: DayCue, now: DateTime<Utc>) -> DateTime<Utc> {
    if matches!(cue, DayCue::Day(_)) && start <= now {
        start + Duration::days(7)
    } else {
        start
    }
}

fn at_time(date: NaiveDate, hour: u32, minute: u32, fallback: DateTime<Utc>) -> DateTime<Utc> {
    date.and_hms_opt(hour, minute, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or(fallback)
}

fn next_full_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    let hours = if now.minute() > 30 { 2 } else { 1 };
    let bumped = now + Duration::hours(hours);
    bumped
        .with_minute(0)
        .and_then(|d| d.with_second(0))
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(bumped)
}

// ============================================================================
// Duration Estimation
// ============================================================================

/// Estimate a duration in minutes: explicit mention, then event-type
/// table, then hour-of-day table, then one hour.
pub fn estimate_duration(lower: &str, start_hour: u32) -> i64 {
    if let Some(captures) = EXPLICIT_HOURS_PATTERN.captures(lower) {
        if let Some(hours) = captures.get(1).and_then(|m| m.as_str().parse::<f64>().ok()) {
            if hours > 0.0 && hours <= 24.0 {
                return (hours * 60.0) as i64;
            }
        }
    }
    if let Some(captures) = EXPLICIT_MINUTES_PATTERN.captures(lower) {
        if let Some(minutes) = captures.get(1).and_then(|m| m.as_str().parse::<i64>().ok()) {
            if minutes > 0 && minutes <= 24 * 60 {
                return minutes;
            }
        }
    }

    for (keyword, minutes) in EVENT_DURATIONS {
        if lower.contains(keyword) {
            return *minutes;
        }
    }

    HOUR_DURATIONS
        .iter()
        .find(|(lo, hi, _)| start_hour >= *lo && start_hour <= *hi)
        .map(|(_, _, minutes)| *minutes)
        .unwrap_or(60)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Monday 2026-03-02, 14:45 UTC.
    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 14, 45, 0).unwrap()
    }

    fn plan(text: &str) -> SchedulePlan {
        plan_schedule(text, None, None, reference())
    }

    #[test]
    fn test_clock_time_with_day_cue() {
        let p = plan("dinner tomorrow 7pm");
        assert_eq!(p.start, Utc.with_ymd_and_hms(2026, 3, 3, 19, 0, 0).unwrap());
        assert_eq!(p.duration_minutes, 90);
        assert_eq!(p.method, ScheduleMethod::ClockTime);
    }

    #[test]
    fn test_anchor_without_clock() {
        let p = plan("dinner tomorrow");
        assert_eq!(p.start, Utc.with_ymd_and_hms(2026, 3, 3, 19, 0, 0).unwrap());
        assert_eq!(p.method, ScheduleMethod::TimeAnchor);
    }

    #[test]
    fn test_day_cue_alone_anchors_at_nine() {
        let p = plan("standup friday");
        assert_eq!(p.start, Utc.with_ymd_and_hms(2026, 3, 6, 9, 0, 0).unwrap());
        assert_eq!(p.method, ScheduleMethod::DayAnchor);
        assert_eq!(p.duration_minutes, 15);
    }

    #[test]
    fn test_same_weekday_rolls_a_week_forward() {
        // Reference is Monday 14:45; "monday" at 9:00 has already passed.
        let p = plan("review monday");
        assert_eq!(p.start, Utc.with_ymd_and_hms(2026, 3, 9, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_past_clock_time_rolls_to_next_day() {
        let p = plan("coffee at 9am");
        assert_eq!(p.start, Utc.with_ymd_and_hms(2026, 3, 3, 9, 0, 0).unwrap());
        assert_eq!(p.duration_minutes, 30);
    }

    #[test]
    fn test_future_clock_time_stays_today() {
        let p = plan("sync at 7pm");
        assert_eq!(p.start, Utc.with_ymd_and_hms(2026, 3, 2, 19, 0, 0).unwrap());
    }

    #[test]
    fn test_no_cues_past_half_hour_adds_two() {
        let p = plan("do the thing");
        assert_eq!(p.start, Utc.with_ymd_and_hms(2026, 3, 2, 16, 0, 0).unwrap());
        assert_eq!(p.method, ScheduleMethod::NextFullHour);
    }

    #[test]
    fn test_no_cues_before_half_hour_adds_one() {
        let early = Utc.with_ymd_and_hms(2026, 3, 2, 14, 10, 0).unwrap();
        let p = plan_schedule("do the thing", None, None, early);
        assert_eq!(p.start, Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap());
    }

    #[test]
    fn test_partial_start_trusted() {
        let start = Utc.with_ymd_and_hms(2026, 3, 5, 10, 0, 0).unwrap();
        let p = plan_schedule("meeting", Some(start), None, reference());
        assert_eq!(p.start, start);
        assert_eq!(p.confidence, 0.7);
        assert_eq!(p.end, start + Duration::minutes(60));
        assert_eq!(p.method, ScheduleMethod::PartialDraft);
    }

    #[test]
    fn test_explicit_duration_beats_event_table() {
        let p = plan("meeting tomorrow for 2 hours");
        assert_eq!(p.duration_minutes, 120);
    }

    #[test]
    fn test_afternoon_wins_over_embedded_noon() {
        let p = plan("walk tomorrow afternoon");
        assert_eq!(p.start.hour(), 14);
    }

    #[test]
    fn test_midnight_wins_over_embedded_night() {
        let p = plan("deploy tomorrow at midnight");
        assert_eq!(p.start.hour(), 0);
    }

    #[test]
    fn test_twelve_hour_conversion() {
        assert_eq!(find_clock_time("lunch at 12pm"), Some((12, 0)));
        assert_eq!(find_clock_time("launch at 12am"), Some((0, 0)));
        assert_eq!(find_clock_time("call at 9:30pm"), Some((21, 30)));
        assert_eq!(find_clock_time("ops review 16:15"), Some((16, 15)));
    }

    #[test]
    fn test_hour_of_day_duration_fallback() {
        // "thing at 10am" has no event keyword and no explicit duration.
        assert_eq!(estimate_duration("thing at 10am", 10), 30);
        assert_eq!(estimate_duration("thing at 8pm", 20), 90);
        assert_eq!(estimate_duration("thing at 11pm", 23), 60);
    }
}
