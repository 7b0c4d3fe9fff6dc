//! Strategy selection.
//!
//! A pure function of (kind, context, config): identical inputs always
//! yield the identical strategy. Kept free of side effects so the table
//! can be tested exhaustively.

use crate::config::RecoveryConfig;

use super::types::{FailureContext, FailureKind, RecoveryStrategy};

/// Pick the recovery strategy for a classified failure.
pub fn select_strategy(
    kind: FailureKind,
    ctx: &FailureContext,
    config: &RecoveryConfig,
) -> RecoveryStrategy {
    let retries_remain = ctx.retry_count < config.retry.max_attempts;
    let features = &config.features;
    let has_text = !ctx.raw_text.trim().is_empty();

    match kind {
        FailureKind::Network => {
            if retries_remain {
                RecoveryStrategy::RetryWithBackoff
            } else if features.offline_mode {
                RecoveryStrategy::OfflineMode
            } else if features.fallback_creation {
                RecoveryStrategy::FallbackEventCreation
            } else {
                RecoveryStrategy::NoRecoveryPossible
            }
        }
        FailureKind::Timeout => {
            if retries_remain {
                RecoveryStrategy::RetryWithBackoff
            } else if features.fallback_creation {
                RecoveryStrategy::FallbackEventCreation
            } else {
                RecoveryStrategy::NoRecoveryPossible
            }
        }
        FailureKind::ParsingFailure => {
            if has_text && features.fallback_creation {
                RecoveryStrategy::FallbackEventCreation
            } else {
                RecoveryStrategy::ManualInputSuggestion
            }
        }
        FailureKind::LowConfidence => {
            if ctx.user_interaction_allowed && features.user_confirmation {
                RecoveryStrategy::UserConfirmationRequired
            } else if features.fallback_creation {
                RecoveryStrategy::FallbackEventCreation
            } else {
                RecoveryStrategy::NoRecoveryPossible
            }
        }
        FailureKind::ValidationError => {
            if features.graceful_degradation {
                RecoveryStrategy::GracefulDegradation
            } else {
                RecoveryStrategy::NoRecoveryPossible
            }
        }
        FailureKind::CalendarLaunchFailure => RecoveryStrategy::AlternativeCalendarLaunch,
        FailureKind::InsufficientData => {
            if features.fallback_creation && has_text {
                RecoveryStrategy::FallbackEventCreation
            } else {
                RecoveryStrategy::ManualInputSuggestion
            }
        }
        FailureKind::RateLimit => RecoveryStrategy::CacheAndRetryLater,
        FailureKind::ServerError => {
            if retries_remain {
                RecoveryStrategy::RetryWithBackoff
            } else if features.offline_mode {
                RecoveryStrategy::OfflineMode
            } else {
                RecoveryStrategy::NoRecoveryPossible
            }
        }
        FailureKind::Unknown => {
            if retries_remain {
                RecoveryStrategy::RetryWithBackoff
            } else {
                RecoveryStrategy::NoRecoveryPossible
            }
        }
    }
}
