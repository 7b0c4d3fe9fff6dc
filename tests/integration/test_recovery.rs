//! Tests for the recovery orchestrator against an on-disk store.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use kalends::{
    FailureContext, FailureKind, FailurePatternStore, FileKvStore, KvStore, RecoveryOrchestrator,
    RecoveryStrategy, UserAction,
};

use crate::support::test_config;

async fn open_orchestrator(dir: &TempDir) -> (RecoveryOrchestrator, Arc<FileKvStore>) {
    let store = Arc::new(FileKvStore::open(dir.path()).await.unwrap());
    let orchestrator = RecoveryOrchestrator::new(test_config(dir.path()), store.clone());
    (orchestrator, store)
}

#[tokio::test]
async fn test_retry_delay_follows_backoff_curve() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileKvStore::open(dir.path()).await.unwrap());
    // Default retry settings: 1s base, doubling per attempt.
    let mut config = test_config(dir.path());
    config.retry.base_delay_ms = 1000;
    config.retry.max_delay_ms = 10_000;
    config.retry.max_attempts = 5;
    let orchestrator = RecoveryOrchestrator::new(config, store);

    let mut delays = Vec::new();
    for retry_count in 0..3 {
        let ctx = FailureContext::new(FailureKind::Network, "team sync tomorrow")
            .with_retry_count(retry_count);
        let outcome = orchestrator.handle(ctx).await;
        assert_eq!(outcome.strategy, RecoveryStrategy::RetryWithBackoff);
        assert!(outcome.retry_recommended);
        delays.push(outcome.retry_delay.unwrap());
    }

    assert_eq!(delays[0], Duration::from_millis(1000));
    assert_eq!(delays[1], Duration::from_millis(2000));
    assert_eq!(delays[2], Duration::from_millis(4000));
}

#[tokio::test]
async fn test_fallback_produces_reviewable_event() {
    let dir = TempDir::new().unwrap();
    let (orchestrator, _store) = open_orchestrator(&dir).await;

    let ctx = FailureContext::new(
        FailureKind::ParsingFailure,
        "Dinner with Alex at Luigi's tomorrow at 7pm",
    );
    let outcome = orchestrator.handle(ctx).await;

    assert!(outcome.success);
    assert_eq!(outcome.strategy, RecoveryStrategy::FallbackEventCreation);
    let event = outcome.event.expect("fallback must produce an event");
    assert!(!event.title.is_empty());
    assert!(
        event.confidence >= 0.1 && event.confidence <= 0.6,
        "fallback confidence out of range: {}",
        event.confidence
    );
}

#[tokio::test]
async fn test_calendar_launch_failure_offers_alternative() {
    let dir = TempDir::new().unwrap();
    let (orchestrator, _store) = open_orchestrator(&dir).await;

    let ctx = FailureContext::new(FailureKind::CalendarLaunchFailure, "review at 3pm");
    let outcome = orchestrator.handle(ctx).await;

    assert!(!outcome.success);
    assert_eq!(outcome.strategy, RecoveryStrategy::AlternativeCalendarLaunch);
    assert_eq!(
        outcome.required_action,
        Some(UserAction::ChooseAlternativeCalendar)
    );
    assert!(outcome.event.is_none());
    assert!(!outcome.message.is_empty());
}

#[tokio::test]
async fn test_repeated_failures_accumulate_in_pattern_store() {
    let dir = TempDir::new().unwrap();
    let (orchestrator, store) = open_orchestrator(&dir).await;

    // Same shape: similar length, word count, no time or date cues.
    let first = orchestrator
        .handle(FailureContext::new(
            FailureKind::ParsingFailure,
            "plan the offsite agenda",
        ))
        .await;
    let second = orchestrator
        .handle(FailureContext::new(
            FailureKind::ParsingFailure,
            "draft the project brief",
        ))
        .await;

    assert_eq!(first.metrics.get("similar_failures"), Some(&json!(1)));
    assert_eq!(second.metrics.get("similar_failures"), Some(&json!(2)));

    let ranked = FailurePatternStore::new(store).ranked().await.unwrap();
    assert_eq!(ranked.len(), 1, "both texts should share one fingerprint");
    assert_eq!(ranked[0].1, 2);
}

#[tokio::test]
async fn test_analytics_toggle_disables_pattern_tracking() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileKvStore::open(dir.path()).await.unwrap());
    let mut config = test_config(dir.path());
    config.features.analytics = false;
    let orchestrator = RecoveryOrchestrator::new(config, store.clone());

    let outcome = orchestrator
        .handle(FailureContext::new(
            FailureKind::ParsingFailure,
            "plan the offsite agenda",
        ))
        .await;

    assert_eq!(outcome.metrics.get("similar_failures"), None);
    let ranked = FailurePatternStore::new(store).ranked().await.unwrap();
    assert!(ranked.is_empty());

    // The anonymized outcome log is not part of analytics and still fills.
    let stats = orchestrator.outcomes().stats().await.unwrap();
    assert_eq!(stats.total, 1);
}

#[tokio::test]
async fn test_outcome_log_keeps_only_anonymized_fields() {
    let dir = TempDir::new().unwrap();
    let (orchestrator, store) = open_orchestrator(&dir).await;

    let secret = "Meet informant at the old warehouse, midnight";
    orchestrator
        .handle(FailureContext::new(FailureKind::ParsingFailure, secret))
        .await;

    // Nothing persisted under the outcomes key may contain the raw text.
    let stored = store.get("outcomes").await.unwrap().unwrap();
    let raw = stored.value.to_string();
    assert!(
        !raw.contains("warehouse"),
        "outcome log must never persist request text"
    );
    assert!(raw.contains(&secret.chars().count().to_string()));
}

#[tokio::test]
async fn test_disabled_features_leave_no_recovery() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileKvStore::open(dir.path()).await.unwrap());
    let mut config = test_config(dir.path());
    config.retry.max_attempts = 0;
    config.features.offline_mode = false;
    config.features.fallback_creation = false;
    let orchestrator = RecoveryOrchestrator::new(config, store);

    let outcome = orchestrator
        .handle(FailureContext::new(FailureKind::Network, "sync at noon"))
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.strategy, RecoveryStrategy::NoRecoveryPossible);
    assert!(
        !outcome.message.is_empty(),
        "terminal failures still explain themselves"
    );
}
