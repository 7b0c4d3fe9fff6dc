//! Append-only log of anonymized recovery outcomes.
//!
//! Records carry only coarse request shape (length, never content) so the
//! log can be kept across sessions without retaining user text.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::recovery::{FailureKind, RecoveryStrategy};

use super::kv::{modify, KvStore, StoreResult};

const OUTCOMES_KEY: &str = "outcomes";

/// Retained record count after compaction.
const SOFT_CAP: usize = 100;
/// Log length that triggers compaction back down to [`SOFT_CAP`].
const HARD_CAP: usize = 150;

/// One recovery attempt, stripped of request content.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnonymizedOutcomeRecord {
    pub kind: FailureKind,
    pub timestamp: DateTime<Utc>,
    /// Length of the original text; the text itself is never stored.
    pub text_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub strategy: RecoveryStrategy,
    pub success: bool,
    pub retry_count: u32,
    pub processing_ms: u64,
    pub network_available: bool,
    /// Coarse platform tag, e.g. "linux" or "macos".
    pub device: String,
}

impl AnonymizedOutcomeRecord {
    pub fn new(kind: FailureKind, strategy: RecoveryStrategy, success: bool) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
            text_length: 0,
            confidence: None,
            strategy,
            success,
            retry_count: 0,
            processing_ms: 0,
            network_available: true,
            device: std::env::consts::OS.to_string(),
        }
    }

    pub fn with_text_length(mut self, length: usize) -> Self {
        self.text_length = length;
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_processing_ms(mut self, processing_ms: u64) -> Self {
        self.processing_ms = processing_ms;
        self
    }

    pub fn with_network_available(mut self, available: bool) -> Self {
        self.network_available = available;
        self
    }
}

/// Aggregate view over the outcome log.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OutcomeStats {
    pub total: usize,
    pub successes: usize,
    pub by_kind: HashMap<String, usize>,
    pub by_strategy: HashMap<String, usize>,
}

impl OutcomeStats {
    pub fn success_rate(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.successes as f32 / self.total as f32
    }
}

/// Outcome log on top of a [`KvStore`], compacted past [`HARD_CAP`].
pub struct OutcomeLog {
    store: Arc<dyn KvStore>,
}

impl OutcomeLog {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Append a record; compacts to the newest [`SOFT_CAP`] once the log
    /// grows past [`HARD_CAP`].
    pub async fn append(&self, record: AnonymizedOutcomeRecord) -> StoreResult<()> {
        modify(self.store.as_ref(), OUTCOMES_KEY, |current| {
            let mut items = decode_items(current);
            items.push(record.clone());
            if items.len() > HARD_CAP {
                let excess = items.len() - SOFT_CAP;
                items.drain(..excess);
            }
            encode_items(&items)
        })
        .await?;
        Ok(())
    }

    /// All retained records, oldest first.
    pub async fn all(&self) -> StoreResult<Vec<AnonymizedOutcomeRecord>> {
        let stored = self.store.get(OUTCOMES_KEY).await?;
        Ok(stored
            .map(|v| decode_items(Some(&v.value)))
            .unwrap_or_default())
    }

    /// Counts by kind and strategy over the retained records.
    pub async fn stats(&self) -> StoreResult<OutcomeStats> {
        let records = self.all().await?;
        let mut stats = OutcomeStats {
            total: records.len(),
            ..OutcomeStats::default()
        };
        for record in &records {
            if record.success {
                stats.successes += 1;
            }
            *stats
                .by_kind
                .entry(record.kind.display_name().to_string())
                .or_insert(0) += 1;
            *stats
                .by_strategy
                .entry(record.strategy.display_name().to_string())
                .or_insert(0) += 1;
        }
        Ok(stats)
    }

    pub async fn clear(&self) -> StoreResult<()> {
        self.store.remove(OUTCOMES_KEY).await
    }
}

fn decode_items(value: Option<&serde_json::Value>) -> Vec<AnonymizedOutcomeRecord> {
    value
        .and_then(|v| v.as_array())
        .map(|array| {
            array
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

fn encode_items(items: &[AnonymizedOutcomeRecord]) -> serde_json::Value {
    serde_json::to_value(items).unwrap_or_else(|_| serde_json::Value::Array(Vec::new()))
}
