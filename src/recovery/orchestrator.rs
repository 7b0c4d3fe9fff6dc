//! Strategy execution.
//!
//! The orchestrator turns a classified [`FailureContext`] into a
//! [`RecoveryOutcome`]. Every path terminates in an outcome with a
//! non-empty user message; no fault escapes. Persistence problems while
//! recording outcomes are logged and swallowed so they can never mask
//! the recovery result itself.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::{RecoveryConfig, RetryConfig};
use crate::fallback::FallbackGenerator;
use crate::metrics::{get_metrics, Metrics};
use crate::store::{
    AnonymizedOutcomeRecord, CachedRequest, FailurePatternStore, KvStore, OutcomeLog,
    RequestCache,
};

use super::strategy::select_strategy;
use super::types::{FailureContext, RecoveryOutcome, RecoveryStrategy, UserAction};

/// Reason attached to offline-synthesized drafts.
const OFFLINE_REASON: &str = "created offline - no network available";
/// Reason attached when a validation failure degrades to a best-effort event.
const DEGRADED_REASON: &str = "degraded to a best-effort event after validation failure";
/// Confidence pinned to offline-created events, regardless of heuristics.
const OFFLINE_CONFIDENCE: f32 = 0.1;

/// Selects and executes recovery strategies for classified failures.
pub struct RecoveryOrchestrator {
    config: RecoveryConfig,
    generator: FallbackGenerator,
    requests: RequestCache,
    outcomes: OutcomeLog,
    patterns: FailurePatternStore,
}

impl RecoveryOrchestrator {
    pub fn new(config: RecoveryConfig, store: Arc<dyn KvStore>) -> Self {
        let requests = RequestCache::new(store.clone())
            .with_capacity(config.cache.size)
            .with_expiry_hours(config.cache.expiry_hours);
        Self {
            generator: FallbackGenerator::new(),
            requests,
            outcomes: OutcomeLog::new(store.clone()),
            patterns: FailurePatternStore::new(store),
            config,
        }
    }

    /// Replace the fallback generator, e.g. to pin its reference time.
    pub fn with_generator(mut self, generator: FallbackGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// The request cache this orchestrator appends to.
    pub fn requests(&self) -> &RequestCache {
        &self.requests
    }

    /// The outcome log this orchestrator appends to.
    pub fn outcomes(&self) -> &OutcomeLog {
        &self.outcomes
    }

    /// Handle one classified failure and return what the caller does next.
    pub async fn handle(&self, ctx: FailureContext) -> RecoveryOutcome {
        let metrics = get_metrics();
        let _timer = Metrics::start_timer(&metrics.recovery_duration_seconds);

        let kind = ctx.kind;
        let strategy = select_strategy(kind, &ctx, &self.config);
        info!(
            kind = kind.display_name(),
            strategy = strategy.display_name(),
            retry_count = ctx.retry_count,
            network = ctx.network_available,
            "Recovering from failure"
        );

        let mut outcome = self.execute(strategy, &ctx, &metrics).await;

        if self.config.features.analytics {
            match self.patterns.record(&ctx.raw_text, kind).await {
                Ok(count) => {
                    outcome = outcome.with_metric("similar_failures", json!(count));
                }
                Err(err) => warn!(error = %err, "Failed to update failure pattern counts"),
            }
        }

        self.record_outcome(&ctx, &outcome).await;

        if outcome.success {
            metrics.recoveries_total.inc();
        }
        outcome
    }

    async fn execute(
        &self,
        strategy: RecoveryStrategy,
        ctx: &FailureContext,
        metrics: &Metrics,
    ) -> RecoveryOutcome {
        match strategy {
            RecoveryStrategy::RetryWithBackoff => {
                let delay = backoff_delay(&self.config.retry, ctx.retry_count);
                metrics.retries_total.inc();
                debug!(delay_ms = delay.as_millis() as u64, "Scheduling retry");
                RecoveryOutcome::retry_after(
                    delay,
                    format!(
                        "{} while understanding your text. Trying again shortly.",
                        ctx.kind.display_name()
                    ),
                )
            }
            RecoveryStrategy::FallbackEventCreation => {
                let fallback = self.generator.generate(&ctx.raw_text, ctx.partial.as_ref());
                metrics.fallback_events_total.inc();
                RecoveryOutcome::recovered(
                    strategy,
                    fallback.event,
                    "Created a best-effort event from your text. Review the details before saving.",
                )
            }
            RecoveryStrategy::OfflineMode => {
                let fallback = self.generator.generate(&ctx.raw_text, ctx.partial.as_ref());
                let event = fallback
                    .event
                    .with_confidence(OFFLINE_CONFIDENCE)
                    .with_fallback_reason(OFFLINE_REASON);
                metrics.offline_events_total.inc();
                metrics.fallback_events_total.inc();
                RecoveryOutcome::recovered(
                    strategy,
                    event,
                    "No network available. Created the event locally; verify it once you are back online.",
                )
            }
            RecoveryStrategy::GracefulDegradation => {
                let fallback = self.generator.generate(&ctx.raw_text, ctx.partial.as_ref());
                let event = fallback.event.with_fallback_reason(DEGRADED_REASON);
                metrics.fallback_events_total.inc();
                RecoveryOutcome::recovered(
                    strategy,
                    event,
                    "The parsed event had problems, so a simplified version was created instead.",
                )
            }
            RecoveryStrategy::CacheAndRetryLater => {
                self.cache_request(ctx, metrics).await;
                let mut outcome = RecoveryOutcome {
                    success: false,
                    strategy,
                    event: None,
                    message: "The service is busy right now. Your request was saved and will be retried later.".to_string(),
                    required_action: None,
                    retry_recommended: false,
                    retry_delay: None,
                    metrics: Default::default(),
                };
                if let Some(crate::remote::ParserError::RateLimited {
                    retry_after_ms: Some(ms),
                }) = ctx.fault
                {
                    outcome = outcome.with_metric("retry_after_ms", json!(ms));
                }
                outcome
            }
            RecoveryStrategy::UserConfirmationRequired => RecoveryOutcome::needs_user(
                strategy,
                UserAction::ConfirmEvent,
                "The event details are uncertain. Please review and confirm them before creation.",
            ),
            RecoveryStrategy::AlternativeCalendarLaunch => RecoveryOutcome::needs_user(
                strategy,
                UserAction::ChooseAlternativeCalendar,
                "The default calendar could not be opened. Choose another calendar application.",
            ),
            RecoveryStrategy::ManualInputSuggestion => RecoveryOutcome::needs_user(
                strategy,
                UserAction::ReviseInput,
                "There is not enough detail to build an event. Add a time and a short description, or enter it manually.",
            ),
            RecoveryStrategy::NoRecoveryPossible => {
                metrics.recovery_failures_total.inc();
                RecoveryOutcome::terminal(
                    "Unable to create an event from this request. Please try again later or enter the event manually.",
                )
            }
        }
    }

    async fn cache_request(&self, ctx: &FailureContext, metrics: &Metrics) {
        let request = CachedRequest {
            text: ctx.raw_text.clone(),
            timestamp: ctx.timestamp.timestamp_millis(),
            timezone: ctx
                .partial
                .as_ref()
                .map(|draft| draft.timezone.clone())
                .unwrap_or_else(|| "UTC".to_string()),
            locale: self.config.event.locale.clone(),
            retry_count: ctx.retry_count,
            kind: ctx.kind,
        };
        match self.requests.append(request).await {
            Ok(()) => {
                metrics.cached_requests_total.inc();
                if let Ok(len) = self.requests.len().await {
                    metrics.request_cache_size.set(len as i64);
                }
            }
            Err(err) => warn!(error = %err, "Failed to cache request for later retry"),
        }
    }

    /// Anonymized bookkeeping; only derived signals, never the text.
    async fn record_outcome(&self, ctx: &FailureContext, outcome: &RecoveryOutcome) {
        let confidence = outcome
            .event
            .as_ref()
            .map(|event| event.confidence)
            .or(ctx.confidence);
        let mut record =
            AnonymizedOutcomeRecord::new(ctx.kind, outcome.strategy, outcome.success)
                .with_text_length(ctx.raw_text.chars().count())
                .with_retry_count(ctx.retry_count)
                .with_processing_ms(ctx.elapsed.as_millis() as u64)
                .with_network_available(ctx.network_available);
        if let Some(confidence) = confidence {
            record = record.with_confidence(confidence);
        }
        if let Err(err) = self.outcomes.append(record).await {
            warn!(error = %err, "Failed to append outcome record");
        }
    }
}

/// Exponential backoff: `base * multiplier^retry_count`, capped at the
/// configured maximum.
fn backoff_delay(retry: &RetryConfig, retry_count: u32) -> std::time::Duration {
    let factor = retry.backoff_multiplier.powi(retry_count as i32);
    let ms = (retry.base_delay_ms as f64 * factor).round() as u64;
    std::time::Duration::from_millis(ms.min(retry.max_delay_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recovery::FailureKind;
    use crate::remote::ParserError;
    use crate::store::MemoryKvStore;
    use std::time::Duration;

    fn orchestrator(config: RecoveryConfig) -> RecoveryOrchestrator {
        RecoveryOrchestrator::new(config, Arc::new(MemoryKvStore::new()))
    }

    #[tokio::test]
    async fn test_retry_outcome_carries_backoff_delay() {
        let orchestrator = orchestrator(RecoveryConfig::default());
        let ctx = FailureContext::new(FailureKind::Network, "lunch tomorrow");

        let outcome = orchestrator.handle(ctx).await;
        assert_eq!(outcome.strategy, RecoveryStrategy::RetryWithBackoff);
        assert!(outcome.retry_recommended);
        assert_eq!(outcome.retry_delay, Some(Duration::from_millis(1000)));
        assert!(!outcome.message.is_empty());
    }

    #[tokio::test]
    async fn test_offline_mode_pins_confidence() {
        let orchestrator = orchestrator(RecoveryConfig::default());
        let ctx = FailureContext::new(FailureKind::Network, "dinner with Alex friday")
            .with_retry_count(2)
            .with_network_available(false);

        let outcome = orchestrator.handle(ctx).await;
        assert_eq!(outcome.strategy, RecoveryStrategy::OfflineMode);
        assert!(outcome.success);

        let event = outcome.event.unwrap();
        assert_eq!(event.confidence, 0.1);
        assert_eq!(
            event.fallback_reason.as_deref(),
            Some("created offline - no network available")
        );
    }

    #[tokio::test]
    async fn test_rate_limit_caches_request() {
        let orchestrator = orchestrator(RecoveryConfig::default());
        let ctx = FailureContext::new(FailureKind::RateLimit, "standup monday 9am")
            .with_fault(ParserError::RateLimited {
                retry_after_ms: Some(4000),
            });

        let outcome = orchestrator.handle(ctx).await;
        assert_eq!(outcome.strategy, RecoveryStrategy::CacheAndRetryLater);
        assert!(!outcome.success);
        assert_eq!(outcome.metrics.get("retry_after_ms"), Some(&json!(4000)));

        let cached = orchestrator.requests().all().await.unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].text, "standup monday 9am");
        assert_eq!(cached[0].kind, FailureKind::RateLimit);
    }

    #[tokio::test]
    async fn test_every_failure_appends_outcome_record() {
        let orchestrator = orchestrator(RecoveryConfig::default());
        orchestrator
            .handle(FailureContext::new(FailureKind::Timeout, "coffee at 3"))
            .await;
        orchestrator
            .handle(FailureContext::new(FailureKind::ParsingFailure, "gibberish text"))
            .await;

        let records = orchestrator.outcomes().all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, FailureKind::Timeout);
        assert_eq!(records[1].text_length, "gibberish text".chars().count());
    }

    #[tokio::test]
    async fn test_fallback_event_stays_within_bounds() {
        let orchestrator = orchestrator(RecoveryConfig::default());
        let ctx = FailureContext::new(FailureKind::ParsingFailure, "meeting with Dana thursday 2pm");

        let outcome = orchestrator.handle(ctx).await;
        assert_eq!(outcome.strategy, RecoveryStrategy::FallbackEventCreation);
        let event = outcome.event.unwrap();
        assert!(event.confidence >= 0.1 && event.confidence <= 0.6);
        assert!(event.fallback_applied);
        assert!(event.has_timestamps());
    }

    #[tokio::test]
    async fn test_manual_input_suggestion_for_empty_text() {
        let orchestrator = orchestrator(RecoveryConfig::default());
        let ctx = FailureContext::new(FailureKind::InsufficientData, "  ");

        let outcome = orchestrator.handle(ctx).await;
        assert_eq!(outcome.strategy, RecoveryStrategy::ManualInputSuggestion);
        assert_eq!(outcome.required_action, Some(UserAction::ReviseInput));
        assert!(!outcome.message.is_empty());
    }

    #[tokio::test]
    async fn test_terminal_outcome_has_message() {
        let mut config = RecoveryConfig::default();
        config.retry.max_attempts = 0;
        let orchestrator = orchestrator(config);
        let ctx = FailureContext::new(FailureKind::Unknown, "??");

        let outcome = orchestrator.handle(ctx).await;
        assert_eq!(outcome.strategy, RecoveryStrategy::NoRecoveryPossible);
        assert!(!outcome.message.is_empty());
    }

    #[tokio::test]
    async fn test_pattern_counts_gated_by_analytics() {
        let mut config = RecoveryConfig::default();
        config.features.analytics = false;
        let orchestrator = orchestrator(config);
        let outcome = orchestrator
            .handle(FailureContext::new(FailureKind::Timeout, "review at 4pm"))
            .await;
        assert!(outcome.metrics.get("similar_failures").is_none());

        let counting = RecoveryOrchestrator::new(
            RecoveryConfig::default(),
            Arc::new(MemoryKvStore::new()),
        );
        let outcome = counting
            .handle(FailureContext::new(FailureKind::Timeout, "review at 4pm"))
            .await;
        assert_eq!(outcome.metrics.get("similar_failures"), Some(&json!(1)));
    }

    #[test]
    fn test_backoff_sequence_non_decreasing_and_capped() {
        let retry = RetryConfig {
            max_attempts: 10,
            base_delay_ms: 1000,
            max_delay_ms: 6000,
            backoff_multiplier: 2.0,
        };
        let delays: Vec<u64> = (0..6)
            .map(|count| backoff_delay(&retry, count).as_millis() as u64)
            .collect();

        assert_eq!(delays[0], 1000);
        assert_eq!(delays[1], 2000);
        assert_eq!(delays[2], 4000);
        assert_eq!(delays[3], 6000);
        for pair in delays.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert!(delays.iter().all(|d| *d <= 6000));
    }

    #[tokio::test]
    async fn test_degradation_reason_attached() {
        let orchestrator = orchestrator(RecoveryConfig::default());
        let ctx = FailureContext::new(FailureKind::ValidationError, "team offsite next friday");

        let outcome = orchestrator.handle(ctx).await;
        assert_eq!(outcome.strategy, RecoveryStrategy::GracefulDegradation);
        let event = outcome.event.unwrap();
        assert!(event
            .fallback_reason
            .as_deref()
            .unwrap()
            .contains("validation failure"));
    }
}
