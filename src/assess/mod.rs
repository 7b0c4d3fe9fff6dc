//! Confidence assessment and improvement suggestions.

mod confidence;
mod suggestions;

pub use confidence::{
    ConfidenceAssessment, ConfidenceValidator, FieldAssessment, Recommendation, Warning,
    WarningSeverity,
};
pub use suggestions::{generate_suggestions, ImprovementSuggestion, SuggestionKind};
