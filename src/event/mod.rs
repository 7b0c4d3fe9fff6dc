//! Event draft model shared by every pipeline stage.

mod types;

pub use types::{EventDraft, EventField, FieldSignal, FieldSource};
