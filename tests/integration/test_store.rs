//! Durability tests for the persisted collections.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tempfile::TempDir;

use kalends::{
    AnonymizedOutcomeRecord, CachedRequest, FailureKind, FailurePatternStore, FileKvStore,
    KvStore, OutcomeLog, RecoveryStrategy, RequestCache, StoreError,
};

fn request(text: &str) -> CachedRequest {
    CachedRequest {
        text: text.to_string(),
        timestamp: Utc::now().timestamp_millis(),
        timezone: "UTC".to_string(),
        locale: "en-US".to_string(),
        retry_count: 0,
        kind: FailureKind::Network,
    }
}

#[tokio::test]
async fn test_request_cache_survives_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = Arc::new(FileKvStore::open(dir.path()).await.unwrap());
        let cache = RequestCache::new(store);
        cache.append(request("dinner tomorrow at 7")).await.unwrap();
    }

    let store = Arc::new(FileKvStore::open(dir.path()).await.unwrap());
    let all = RequestCache::new(store).all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].text, "dinner tomorrow at 7");
}

#[tokio::test]
async fn test_capacity_enforced_across_sessions() {
    let dir = TempDir::new().unwrap();

    for text in ["first request", "second request", "third request"] {
        let store = Arc::new(FileKvStore::open(dir.path()).await.unwrap());
        let cache = RequestCache::new(store).with_capacity(2);
        cache.append(request(text)).await.unwrap();
    }

    let store = Arc::new(FileKvStore::open(dir.path()).await.unwrap());
    let all = RequestCache::new(store)
        .with_capacity(2)
        .all()
        .await
        .unwrap();
    assert_eq!(all.len(), 2, "oldest entry should have been evicted");
    assert_eq!(all[0].text, "second request");
    assert_eq!(all[1].text, "third request");
}

#[tokio::test]
async fn test_outcome_stats_accumulate_across_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = Arc::new(FileKvStore::open(dir.path()).await.unwrap());
        let log = OutcomeLog::new(store);
        log.append(AnonymizedOutcomeRecord::new(
            FailureKind::Network,
            RecoveryStrategy::RetryWithBackoff,
            false,
        ))
        .await
        .unwrap();
        log.append(AnonymizedOutcomeRecord::new(
            FailureKind::Network,
            RecoveryStrategy::OfflineMode,
            true,
        ))
        .await
        .unwrap();
    }

    let store = Arc::new(FileKvStore::open(dir.path()).await.unwrap());
    let log = OutcomeLog::new(store);
    log.append(AnonymizedOutcomeRecord::new(
        FailureKind::ParsingFailure,
        RecoveryStrategy::FallbackEventCreation,
        true,
    ))
    .await
    .unwrap();

    let stats = log.stats().await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.successes, 2);
    assert_eq!(stats.by_kind.get("Network Error"), Some(&2));
    assert_eq!(stats.by_strategy.get("Offline Mode"), Some(&1));
}

#[tokio::test]
async fn test_stale_write_from_second_handle_conflicts() {
    let dir = TempDir::new().unwrap();
    let first = FileKvStore::open(dir.path()).await.unwrap();
    let second = FileKvStore::open(dir.path()).await.unwrap();

    first
        .compare_and_swap("shared", None, json!({"writer": "first"}))
        .await
        .unwrap();
    second
        .compare_and_swap("shared", Some(1), json!({"writer": "second"}))
        .await
        .unwrap();

    // The first handle's view of version 1 is now stale.
    let err = first
        .compare_and_swap("shared", Some(1), json!({"writer": "first"}))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::VersionConflict {
            found: Some(2),
            ..
        }
    ));
}

#[tokio::test]
async fn test_concurrent_appends_all_recorded() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileKvStore::open(dir.path()).await.unwrap());
    let cache = Arc::new(RequestCache::new(store));

    let mut handles = Vec::new();
    for i in 0..8 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            cache
                .append(request(&format!("cached request {i}")))
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(cache.len().await.unwrap(), 8, "no append may be lost");
}

#[tokio::test]
async fn test_pattern_counts_persist_across_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = Arc::new(FileKvStore::open(dir.path()).await.unwrap());
        let patterns = FailurePatternStore::new(store);
        patterns
            .record("plan the offsite agenda", FailureKind::ParsingFailure)
            .await
            .unwrap();
    }

    let store = Arc::new(FileKvStore::open(dir.path()).await.unwrap());
    let patterns = FailurePatternStore::new(store);
    let count = patterns
        .record("plan the offsite agenda", FailureKind::ParsingFailure)
        .await
        .unwrap();
    assert_eq!(count, 2);
    assert_eq!(
        patterns
            .count("plan the offsite agenda", FailureKind::ParsingFailure)
            .await
            .unwrap(),
        2
    );
}
