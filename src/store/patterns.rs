//! Failure pattern counters keyed by coarse text shape.
//!
//! A pattern key is a fingerprint of the failed request (length bucket,
//! word-count bucket, time/date cues, punctuation density, failure kind).
//! Only counters are persisted; the text never is. Counts feed back into
//! ranking improvement suggestions for recurring failure shapes.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::fallback::{has_day_cue, has_time_cue};
use crate::recovery::FailureKind;

use super::kv::{modify, KvStore, StoreResult};

const PATTERNS_KEY: &str = "patterns";

/// Coarse fingerprint of a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternKey {
    /// 0: very short, 1: short, 2: medium, 3: long.
    pub length_bucket: u8,
    /// 0: <3 words, 1: <8, 2: <20, 3: 20 or more.
    pub word_bucket: u8,
    pub has_time: bool,
    pub has_date: bool,
    /// 0: plain text, 1: some punctuation, 2: punctuation heavy.
    pub complexity_bucket: u8,
    pub kind: FailureKind,
}

impl PatternKey {
    /// Derive the fingerprint for a request text and its failure kind.
    pub fn fingerprint(text: &str, kind: FailureKind) -> Self {
        let trimmed = text.trim();
        let length_bucket = match trimmed.chars().count() {
            0..=14 => 0,
            15..=49 => 1,
            50..=149 => 2,
            _ => 3,
        };
        let word_bucket = match trimmed.split_whitespace().count() {
            0..=2 => 0,
            3..=7 => 1,
            8..=19 => 2,
            _ => 3,
        };
        Self {
            length_bucket,
            word_bucket,
            has_time: has_time_cue(trimmed),
            has_date: has_day_cue(trimmed),
            complexity_bucket: complexity_bucket(trimmed),
            kind,
        }
    }

    /// Canonical string form used as the persisted map key.
    pub fn storage_key(&self) -> String {
        format!(
            "len{}-words{}-time{}-date{}-cx{}-{}",
            self.length_bucket,
            self.word_bucket,
            if self.has_time { 1 } else { 0 },
            if self.has_date { 1 } else { 0 },
            self.complexity_bucket,
            self.kind.slug(),
        )
    }
}

fn complexity_bucket(text: &str) -> u8 {
    let total = text.chars().count();
    if total == 0 {
        return 0;
    }
    let punctuation = text
        .chars()
        .filter(|c| c.is_ascii_punctuation())
        .count();
    let ratio = punctuation as f32 / total as f32;
    if ratio < 0.02 {
        0
    } else if ratio < 0.1 {
        1
    } else {
        2
    }
}

/// Persisted pattern counters on top of a [`KvStore`].
pub struct FailurePatternStore {
    store: Arc<dyn KvStore>,
}

impl FailurePatternStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Increment the counter for this request's fingerprint.
    pub async fn record(&self, text: &str, kind: FailureKind) -> StoreResult<u64> {
        let key = PatternKey::fingerprint(text, kind).storage_key();
        let mut observed = 1;
        modify(self.store.as_ref(), PATTERNS_KEY, |current| {
            let mut counts = decode_counts(current);
            let entry = counts.entry(key.clone()).or_insert(0);
            *entry += 1;
            observed = *entry;
            encode_counts(&counts)
        })
        .await?;
        Ok(observed)
    }

    /// How many times this fingerprint has been seen.
    pub async fn count(&self, text: &str, kind: FailureKind) -> StoreResult<u64> {
        let key = PatternKey::fingerprint(text, kind).storage_key();
        let stored = self.store.get(PATTERNS_KEY).await?;
        Ok(stored
            .map(|v| decode_counts(Some(&v.value)))
            .unwrap_or_default()
            .get(&key)
            .copied()
            .unwrap_or(0))
    }

    /// All counters, most frequent first.
    pub async fn ranked(&self) -> StoreResult<Vec<(String, u64)>> {
        let stored = self.store.get(PATTERNS_KEY).await?;
        let counts = stored
            .map(|v| decode_counts(Some(&v.value)))
            .unwrap_or_default();
        let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(ranked)
    }

    pub async fn clear(&self) -> StoreResult<()> {
        self.store.remove(PATTERNS_KEY).await
    }
}

fn decode_counts(value: Option<&serde_json::Value>) -> HashMap<String, u64> {
    value
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

fn encode_counts(counts: &HashMap<String, u64>) -> serde_json::Value {
    serde_json::to_value(counts).unwrap_or_else(|_| serde_json::Value::Object(Default::default()))
}
