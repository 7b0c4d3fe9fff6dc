//! Heuristic fallback event synthesis.

mod generator;
mod schedule;
mod title;

pub use generator::{FallbackEvent, FallbackGenerator};
pub use schedule::{
    estimate_duration, has_clock_time, has_day_cue, has_duration_cue, has_time_cue,
    plan_schedule, ScheduleMethod, SchedulePlan,
};
pub use title::{extract_title, TitleExtraction, TitleMethod, EVENT_KEYWORDS, GENERIC_TITLE};
