//! Persisted cache of failed requests awaiting a later retry.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::recovery::FailureKind;

use super::kv::{modify, KvStore, StoreResult};

const REQUESTS_KEY: &str = "requests";

/// A failed request kept for replay once conditions improve.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachedRequest {
    /// Original request text.
    pub text: String,
    /// Epoch milliseconds at caching time.
    pub timestamp: i64,
    /// IANA timezone the request was made in.
    pub timezone: String,
    pub locale: String,
    pub retry_count: u32,
    /// Failure that caused the request to be cached.
    pub kind: FailureKind,
}

impl CachedRequest {
    fn age(&self, now: DateTime<Utc>) -> Duration {
        now - DateTime::from_timestamp_millis(self.timestamp).unwrap_or(now)
    }
}

/// FIFO-bounded request cache on top of a [`KvStore`].
pub struct RequestCache {
    store: Arc<dyn KvStore>,
    capacity: usize,
    expiry: Duration,
}

impl RequestCache {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            capacity: 50,
            expiry: Duration::hours(24),
        }
    }

    /// Bound the cache; the oldest entries are evicted first.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.clamp(1, 1000);
        self
    }

    /// Entries older than this are dropped on the next read or append.
    pub fn with_expiry_hours(mut self, hours: u64) -> Self {
        self.expiry = Duration::hours(hours.max(1) as i64);
        self
    }

    /// Append a request, evicting expired then oldest entries as needed.
    pub async fn append(&self, request: CachedRequest) -> StoreResult<()> {
        let capacity = self.capacity;
        let expiry = self.expiry;
        let now = Utc::now();

        modify(self.store.as_ref(), REQUESTS_KEY, |current| {
            let mut items = decode_items(current);
            items.push(request.clone());
            items.retain(|r| r.age(now) <= expiry);
            if items.len() > capacity {
                let excess = items.len() - capacity;
                items.drain(..excess);
            }
            encode_items(&items)
        })
        .await?;
        Ok(())
    }

    /// All cached requests that have not yet expired, oldest first.
    pub async fn all(&self) -> StoreResult<Vec<CachedRequest>> {
        let now = Utc::now();
        let stored = self.store.get(REQUESTS_KEY).await?;
        let mut items = stored
            .map(|v| decode_items(Some(&v.value)))
            .unwrap_or_default();
        items.retain(|r| r.age(now) <= self.expiry);
        Ok(items)
    }

    /// Number of cached requests, expired entries included.
    pub async fn len(&self) -> StoreResult<usize> {
        let stored = self.store.get(REQUESTS_KEY).await?;
        Ok(stored
            .map(|v| decode_items(Some(&v.value)).len())
            .unwrap_or(0))
    }

    pub async fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Drop every cached request.
    pub async fn clear(&self) -> StoreResult<()> {
        self.store.remove(REQUESTS_KEY).await
    }
}

/// Unreadable entries are skipped rather than poisoning the whole cache.
fn decode_items(value: Option<&serde_json::Value>) -> Vec<CachedRequest> {
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

fn encode_items(items: &[CachedRequest]) -> serde_json::Value {
    serde_json::to_value(items).unwrap_or_else(|_| serde_json::Value::Array(Vec::new()))
}
