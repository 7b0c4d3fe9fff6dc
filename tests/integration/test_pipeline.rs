//! End-to-end pipeline tests against an on-disk store.

use std::sync::Arc;

use tempfile::TempDir;

use kalends::{
    EventPipeline, EventRequest, FailureKind, FileKvStore, OutcomeLog, ParserError,
    PipelineOutcome, RecoveryStrategy, RequestCache, UserAction,
};

use crate::support::{full_parse, test_config, ScriptedParser};

async fn open_store(dir: &TempDir) -> Arc<FileKvStore> {
    Arc::new(FileKvStore::open(dir.path()).await.unwrap())
}

#[tokio::test]
async fn test_confident_parse_becomes_event() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let parser = ScriptedParser::new(vec![Ok(full_parse(0.9))]);
    let pipeline = EventPipeline::new(test_config(dir.path()), parser.clone(), store.clone());

    let outcome = pipeline
        .process(EventRequest::new("standup tomorrow at 9am"))
        .await
        .unwrap();

    match outcome {
        PipelineOutcome::Event(processed) => {
            let event = processed.event();
            assert_eq!(event.title, "Team standup");
            assert!(event.start.is_some(), "start should survive sanitization");
            assert!(event.end.is_some(), "end should survive sanitization");
        }
        other => panic!("expected an event, got {other:?}"),
    }
    assert_eq!(parser.calls(), 1, "confident parse should not retry");

    // A clean parse never reaches the recovery path.
    let stats = OutcomeLog::new(store).stats().await.unwrap();
    assert_eq!(stats.total, 0);
}

#[tokio::test]
async fn test_network_failure_retries_then_succeeds() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let parser = ScriptedParser::new(vec![
        Err(ParserError::Network("connection refused".to_string())),
        Ok(full_parse(0.8)),
    ]);
    let pipeline = EventPipeline::new(test_config(dir.path()), parser.clone(), store);

    let outcome = pipeline
        .process(EventRequest::new("standup tomorrow at 9am"))
        .await
        .unwrap();

    assert!(matches!(outcome, PipelineOutcome::Event(_)));
    assert_eq!(parser.calls(), 2, "exactly one retry should have happened");
}

#[tokio::test]
async fn test_outage_exhausts_retries_then_goes_offline() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    // Empty script: every call is a network error.
    let parser = ScriptedParser::new(Vec::new());
    let pipeline = EventPipeline::new(test_config(dir.path()), parser.clone(), store.clone());

    let outcome = pipeline
        .process(EventRequest::new("dentist appointment friday 2pm").with_network_available(false))
        .await
        .unwrap();

    match outcome {
        PipelineOutcome::Event(processed) => {
            let event = processed.event();
            assert!(
                (event.confidence - 0.1).abs() < f32::EPSILON,
                "offline events carry the floor confidence, got {}",
                event.confidence
            );
            assert!(event.fallback_reason.is_some());
        }
        other => panic!("expected an offline event, got {other:?}"),
    }
    assert_eq!(parser.calls(), 3, "initial attempt plus two retries");

    // Two retry decisions and the final offline recovery, all on disk.
    let stats = OutcomeLog::new(store).stats().await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.by_strategy.get("Retry with Backoff"), Some(&2));
    assert_eq!(stats.by_strategy.get("Offline Mode"), Some(&1));
    assert_eq!(stats.by_kind.get("Network Error"), Some(&3));
}

#[tokio::test]
async fn test_rate_limited_request_is_cached_for_later() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let parser = ScriptedParser::new(vec![Err(ParserError::RateLimited {
        retry_after_ms: Some(2500),
    })]);
    let pipeline = EventPipeline::new(test_config(dir.path()), parser.clone(), store.clone());

    let outcome = pipeline
        .process(EventRequest::new("lunch with the design team"))
        .await
        .unwrap();

    match outcome {
        PipelineOutcome::Failed { strategy, .. } => {
            assert_eq!(strategy, RecoveryStrategy::CacheAndRetryLater);
        }
        other => panic!("expected a parked request, got {other:?}"),
    }
    assert_eq!(parser.calls(), 1, "rate limits must not trigger retries");

    let cached = RequestCache::new(store).all().await.unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].text, "lunch with the design team");
    assert_eq!(cached[0].kind, FailureKind::RateLimit);
}

#[tokio::test]
async fn test_uncertain_parse_asks_for_confirmation_and_logs_it() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let parser = ScriptedParser::new(vec![Ok(full_parse(0.2))]);
    let pipeline = EventPipeline::new(test_config(dir.path()), parser.clone(), store.clone());

    let outcome = pipeline
        .process(EventRequest::new("maybe catch up with Sam sometime"))
        .await
        .unwrap();

    match outcome {
        PipelineOutcome::ActionRequired {
            strategy, action, ..
        } => {
            assert_eq!(strategy, RecoveryStrategy::UserConfirmationRequired);
            assert_eq!(action, UserAction::ConfirmEvent);
        }
        other => panic!("expected a confirmation request, got {other:?}"),
    }

    let stats = OutcomeLog::new(store).stats().await.unwrap();
    assert_eq!(stats.by_kind.get("Low Confidence"), Some(&1));
}

#[tokio::test]
async fn test_headless_uncertain_parse_falls_back_instead() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir).await;
    let parser = ScriptedParser::new(vec![Ok(full_parse(0.2))]);
    let pipeline = EventPipeline::new(test_config(dir.path()), parser, store);

    let outcome = pipeline
        .process(
            EventRequest::new("coffee with Dana tomorrow morning")
                .with_user_interaction_allowed(false),
        )
        .await
        .unwrap();

    match outcome {
        PipelineOutcome::Event(processed) => {
            assert!(
                processed.event().confidence <= 0.6,
                "fallback events must stay below the review ceiling"
            );
        }
        other => panic!("expected a fallback event, got {other:?}"),
    }
}
