//! File-backed key-value store.
//!
//! One JSON file per key. Writes go through a temp file followed by a
//! rename so a crash never leaves a half-written record, and a single
//! writer lock serializes the read-check-write window.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::StoreError;

use super::kv::{KvStore, StoreResult, VersionedValue};

#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    version: u64,
    value: serde_json::Value,
}

/// Durable store rooted at a directory.
pub struct FileKvStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileKvStore {
    /// Open a store, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

async fn read_record(path: &Path) -> StoreResult<Option<StoredRecord>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let record = serde_json::from_slice(&bytes).map_err(|err| {
                StoreError::Corrupt(path.display().to_string(), err.to_string())
            })?;
            Ok(Some(record))
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn get(&self, key: &str) -> StoreResult<Option<VersionedValue>> {
        Ok(read_record(&self.path_for(key)).await?.map(|record| {
            VersionedValue {
                value: record.value,
                version: record.version,
            }
        }))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<u64>,
        value: serde_json::Value,
    ) -> StoreResult<u64> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(key);

        let found = read_record(&path).await?.map(|record| record.version);
        if found != expected {
            return Err(StoreError::VersionConflict {
                key: key.to_string(),
                expected,
                found,
            });
        }

        let version = found.unwrap_or(0) + 1;
        let record = StoredRecord { version, value };
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&record)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(version)
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
