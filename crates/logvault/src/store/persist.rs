//! Persist — append and load storage units on disk.
//!
//! Append is a read-modify-write of a whole unit. Appends to the same unit
//! are serialized through a per-key async mutex; different units proceed
//! concurrently. The lock table only covers this process, and an entry
//! lives only while some append holds or waits on it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::StoreError;
use super::unit::StorageKey;
use crate::filter::query::{Query, QueryEngine, QueryView};
use crate::logs::model::{LogEntry, PersistedLogEntry};

/// Result of one append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppendOutcome {
    /// Records written by this call.
    pub saved: usize,
    /// Records in the unit after the write.
    pub total: usize,
}

#[derive(Debug)]
pub struct PersistentLogStore {
    root: PathBuf,
    locks: DashMap<StorageKey, Arc<Mutex<()>>>,
}

impl PersistentLogStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn unit_path(&self, key: &StorageKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    fn unit_lock(&self, key: &StorageKey) -> UnitLock<'_> {
        let mutex = self.locks.entry(key.clone()).or_default().clone();
        UnitLock {
            locks: &self.locks,
            key: key.clone(),
            mutex,
        }
    }

    /// Append `entries` to today's unit for `container_id`.
    pub async fn append(
        &self,
        container_id: &str,
        container_name: &str,
        entries: &[LogEntry],
    ) -> Result<AppendOutcome, StoreError> {
        self.append_at(container_id, container_name, entries, Utc::now()).await
    }

    /// Append with an explicit save time; the unit is the UTC day of `saved_at`.
    pub async fn append_at(
        &self,
        container_id: &str,
        container_name: &str,
        entries: &[LogEntry],
        saved_at: DateTime<Utc>,
    ) -> Result<AppendOutcome, StoreError> {
        let key = StorageKey::for_instant(container_id, saved_at)?;

        let fresh: Vec<PersistedLogEntry> = entries
            .iter()
            .filter(|e| !e.message.trim().is_empty())
            .map(|e| PersistedLogEntry {
                id: new_record_id(container_id, saved_at),
                container_id: container_id.to_string(),
                container_name: container_name.to_string(),
                entry: e.clone(),
                saved_at,
            })
            .collect();
        if fresh.len() < entries.len() {
            debug!(dropped = entries.len() - fresh.len(), "Dropping entries with empty messages");
        }

        let lock = self.unit_lock(&key);
        let _guard = lock.mutex.lock().await;

        self.ensure_root().await?;
        let mut records = self.read_unit(&key).await?;
        let saved = fresh.len();
        records.extend(fresh);
        self.write_unit(&key, &records).await?;

        debug!(container_id, unit = %key.file_name(), saved, total = records.len(), "Appended to storage unit");
        Ok(AppendOutcome {
            saved,
            total: records.len(),
        })
    }

    /// Read one unit; an absent unit is an empty collection.
    pub async fn read_unit(&self, key: &StorageKey) -> Result<Vec<PersistedLogEntry>, StoreError> {
        let path = self.unit_path(key);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        serde_json::from_slice(&data).map_err(|source| StoreError::Corrupt { path, source })
    }

    async fn write_unit(&self, key: &StorageKey, records: &[PersistedLogEntry]) -> Result<(), StoreError> {
        let path = self.unit_path(key);
        let data = serde_json::to_vec_pretty(records).map_err(|source| StoreError::Encode {
            path: path.clone(),
            source,
        })?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &data)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StoreError::io(&path, e))
    }

    async fn ensure_root(&self) -> Result<(), StoreError> {
        if tokio::fs::metadata(&self.root).await.is_err() {
            info!(path = %self.root.display(), "Creating log storage directory");
        }
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StoreError::io(&self.root, e))
    }

    /// Storage units on disk, optionally limited to one container, in
    /// (container, day) order.
    pub async fn units(&self, container_id: Option<&str>) -> Result<Vec<StorageKey>, StoreError> {
        let mut dir = match tokio::fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.root, e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = dir.next_entry().await.map_err(|e| StoreError::io(&self.root, e))? {
            let name = entry.file_name();
            let Some(key) = name.to_str().and_then(StorageKey::parse_file_name) else {
                continue;
            };
            if container_id.map_or(true, |id| key.container_id == id) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Merge every matching unit. A unit that cannot be read or parsed is
    /// logged and skipped; the rest of the load carries on.
    pub async fn load(&self, container_id: Option<&str>) -> Vec<PersistedLogEntry> {
        let keys = match self.units(container_id).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Failed to list storage units");
                return Vec::new();
            }
        };

        let mut merged = Vec::new();
        for key in keys {
            match self.read_unit(&key).await {
                Ok(records) => merged.extend(records),
                Err(e) => warn!(unit = %key.file_name(), error = %e, "Skipping unreadable storage unit"),
            }
        }
        merged
    }

    /// Load the units in scope of `query` and run it over them.
    pub async fn query(&self, query: &Query, view: QueryView) -> Vec<PersistedLogEntry> {
        let records = self.load(query.container_id.as_deref()).await;
        QueryEngine::apply(records, query, view)
    }
}

/// A caller's hold on one unit's mutex. Dropping the last hold removes the
/// table entry.
struct UnitLock<'a> {
    locks: &'a DashMap<StorageKey, Arc<Mutex<()>>>,
    key: StorageKey,
    mutex: Arc<Mutex<()>>,
}

impl Drop for UnitLock<'_> {
    fn drop(&mut self) {
        // One reference in the table, one here: nobody else is waiting.
        self.locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 2);
    }
}

/// `{container}-{millis}-{9 random chars}`.
fn new_record_id(container_id: &str, saved_at: DateTime<Utc>) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", container_id, saved_at.timestamp_millis(), &random[..9])
}
