//! Shared helpers for the integration suite.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;

use kalends::{ParserError, RecoveryConfig, RemoteParse, RemoteParser};

/// A remote parser that replays a scripted sequence of responses.
///
/// Once the script runs out, every further call fails with a network
/// error, which lets a single instance drive both the happy path and
/// an outage.
pub struct ScriptedParser {
    responses: Mutex<VecDeque<Result<RemoteParse, ParserError>>>,
    calls: AtomicUsize,
}

impl ScriptedParser {
    pub fn new(responses: Vec<Result<RemoteParse, ParserError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteParser for ScriptedParser {
    async fn parse(&self, _text: &str) -> Result<RemoteParse, ParserError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(ParserError::Network("script exhausted".to_string())))
    }
}

/// Test configuration rooted in a temp directory, with millisecond
/// retry delays so exhaustion paths finish quickly.
pub fn test_config(data_dir: &Path) -> RecoveryConfig {
    let mut config = RecoveryConfig::default();
    config.storage.data_dir = data_dir.to_string_lossy().to_string();
    config.retry.base_delay_ms = 1;
    config.retry.max_delay_ms = 5;
    config
}

/// A complete, well-formed parse at the given confidence.
pub fn full_parse(confidence: f32) -> RemoteParse {
    let start = Utc::now() + Duration::days(1);
    RemoteParse {
        title: Some("Team standup".to_string()),
        start_datetime: Some(start.to_rfc3339()),
        end_datetime: Some((start + Duration::hours(1)).to_rfc3339()),
        confidence_score: confidence,
        ..Default::default()
    }
}
