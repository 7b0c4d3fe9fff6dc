//! Versioned key-value storage with compare-and-swap writes.
//!
//! Persisted collections here are shared append-only blobs written from
//! several call sites. A plain read-modify-write would silently drop
//! entries under concurrency, so every write carries the version it was
//! based on and fails on mismatch; [`modify`] wraps the retry loop.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::StoreError;

/// Result type for storage operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A stored blob together with its write version.
#[derive(Debug, Clone)]
pub struct VersionedValue {
    pub value: serde_json::Value,
    pub version: u64,
}

/// Versioned blob storage.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value and its current version.
    async fn get(&self, key: &str) -> StoreResult<Option<VersionedValue>>;

    /// Write a value only if the stored version matches `expected`;
    /// `None` means the key must not exist yet. Returns the new version.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<u64>,
        value: serde_json::Value,
    ) -> StoreResult<u64>;

    /// Remove a key. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> StoreResult<()>;
}

/// Read-modify-write with conflict retry.
///
/// The closure sees the current value (or `None`) and returns the
/// replacement; on a version conflict the read is repeated.
pub async fn modify<F>(store: &dyn KvStore, key: &str, mut f: F) -> StoreResult<u64>
where
    F: FnMut(Option<&serde_json::Value>) -> serde_json::Value,
{
    loop {
        let current = store.get(key).await?;
        let (expected, next) = match &current {
            Some(versioned) => (Some(versioned.version), f(Some(&versioned.value))),
            None => (None, f(None)),
        };
        match store.compare_and_swap(key, expected, next).await {
            Ok(version) => return Ok(version),
            Err(StoreError::VersionConflict { .. }) => continue,
            Err(err) => return Err(err),
        }
    }
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// Process-local store; the default for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, VersionedValue>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> StoreResult<Option<VersionedValue>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<u64>,
        value: serde_json::Value,
    ) -> StoreResult<u64> {
        let mut entries = self.entries.write();
        let found = entries.get(key).map(|v| v.version);
        if found != expected {
            return Err(StoreError::VersionConflict {
                key: key.to_string(),
                expected,
                found,
            });
        }
        let version = found.unwrap_or(0) + 1;
        entries.insert(key.to_string(), VersionedValue { value, version });
        Ok(version)
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}
