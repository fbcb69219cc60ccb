use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tracing::{info, warn};

use crate::error::AppError;
use crate::geo::GeoPoint;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub address: String,
    pub point: GeoPoint,
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(address: impl Into<String>, point: GeoPoint) -> Self {
        Self {
            address: address.into(),
            point,
            cached_at: Utc::now(),
        }
    }
}

/// Key-value store for resolved addresses. Keys are exact address strings.
pub trait CacheStore: Send + Sync {
    fn get(&self, address: &str) -> Result<Option<CacheEntry>, AppError>;

    /// Inserts or replaces; last write wins.
    fn upsert(&self, entry: CacheEntry) -> Result<(), AppError>;

    fn delete(&self, address: &str) -> Result<bool, AppError>;

    /// Removes `address` only if it was cached strictly before `cutoff`, so an
    /// entry refreshed by a concurrent lookup survives.
    fn delete_if_older_than(&self, address: &str, cutoff: DateTime<Utc>) -> Result<bool, AppError>;

    /// Removes every entry cached strictly before `cutoff` and returns how many went.
    fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, AppError>;

    fn len(&self) -> usize;

    /// Makes every accepted mutation durable. No-op for stores without backing storage.
    fn flush(&self) -> Result<(), AppError> {
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, address: &str) -> Result<Option<CacheEntry>, AppError> {
        Ok(self.entries.get(address).map(|entry| entry.value().clone()))
    }

    fn upsert(&self, entry: CacheEntry) -> Result<(), AppError> {
        self.entries.insert(entry.address.clone(), entry);
        Ok(())
    }

    fn delete(&self, address: &str) -> Result<bool, AppError> {
        Ok(self.entries.remove(address).is_some())
    }

    fn delete_if_older_than(&self, address: &str, cutoff: DateTime<Utc>) -> Result<bool, AppError> {
        Ok(self
            .entries
            .remove_if(address, |_, entry| entry.cached_at < cutoff)
            .is_some())
    }

    fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, AppError> {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.cached_at >= cutoff);
        Ok(before.saturating_sub(self.entries.len()))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Memory store mirrored to a JSON file so resolved addresses survive restarts.
///
/// Inside a tokio runtime, mutations schedule a snapshot write on the blocking
/// pool; writes requested while one is queued coalesce into it. Outside a
/// runtime the snapshot is written inline. `flush` always writes inline.
#[derive(Debug)]
pub struct FileCacheStore {
    inner: Arc<FileSnapshot>,
}

#[derive(Debug)]
struct FileSnapshot {
    path: PathBuf,
    entries: DashMap<String, CacheEntry>,
    write_lock: Mutex<()>,
    write_queued: AtomicBool,
}

impl FileCacheStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref().to_path_buf();
        let entries = DashMap::new();

        match fs::read_to_string(&path) {
            Ok(raw) => {
                let stored: Vec<CacheEntry> = serde_json::from_str(&raw).map_err(|err| {
                    AppError::Storage(format!("corrupt cache file {}: {err}", path.display()))
                })?;
                for entry in stored {
                    entries.insert(entry.address.clone(), entry);
                }
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                return Err(AppError::Storage(format!(
                    "failed to read {}: {err}",
                    path.display()
                )));
            }
        }

        info!(path = %path.display(), entries = entries.len(), "geocode cache loaded");

        Ok(Self {
            inner: Arc::new(FileSnapshot {
                path,
                entries,
                write_lock: Mutex::new(()),
                write_queued: AtomicBool::new(false),
            }),
        })
    }

    fn schedule_write(&self) -> Result<(), AppError> {
        let Ok(handle) = Handle::try_current() else {
            return self.inner.write();
        };

        if self.inner.write_queued.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let snapshot = self.inner.clone();
        handle.spawn_blocking(move || {
            // Cleared before the snapshot is taken: later mutations queue a new write.
            snapshot.write_queued.store(false, Ordering::Release);
            if let Err(err) = snapshot.write() {
                warn!(path = %snapshot.path.display(), error = %err, "geocode cache write failed");
            }
        });
        Ok(())
    }
}

impl FileSnapshot {
    fn write(&self) -> Result<(), AppError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| AppError::Storage("cache write lock poisoned".to_string()))?;

        let mut snapshot: Vec<CacheEntry> = self
            .entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        snapshot.sort_by(|a, b| a.address.cmp(&b.address));

        let body = serde_json::to_vec_pretty(&snapshot)
            .map_err(|err| AppError::Storage(format!("failed to encode cache: {err}")))?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, body)
            .map_err(|err| AppError::Storage(format!("failed to write {}: {err}", tmp.display())))?;
        fs::rename(&tmp, &self.path).map_err(|err| {
            AppError::Storage(format!("failed to replace {}: {err}", self.path.display()))
        })
    }
}

impl CacheStore for FileCacheStore {
    fn get(&self, address: &str) -> Result<Option<CacheEntry>, AppError> {
        Ok(self
            .inner
            .entries
            .get(address)
            .map(|entry| entry.value().clone()))
    }

    fn upsert(&self, entry: CacheEntry) -> Result<(), AppError> {
        self.inner.entries.insert(entry.address.clone(), entry);
        self.schedule_write()
    }

    fn delete(&self, address: &str) -> Result<bool, AppError> {
        let removed = self.inner.entries.remove(address).is_some();
        if removed {
            self.schedule_write()?;
        }
        Ok(removed)
    }

    fn delete_if_older_than(&self, address: &str, cutoff: DateTime<Utc>) -> Result<bool, AppError> {
        let removed = self
            .inner
            .entries
            .remove_if(address, |_, entry| entry.cached_at < cutoff)
            .is_some();
        if removed {
            self.schedule_write()?;
        }
        Ok(removed)
    }

    fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, AppError> {
        let entries = &self.inner.entries;
        let before = entries.len();
        entries.retain(|_, entry| entry.cached_at >= cutoff);
        let purged = before.saturating_sub(entries.len());
        if purged > 0 {
            self.schedule_write()?;
        }
        Ok(purged)
    }

    fn len(&self) -> usize {
        self.inner.entries.len()
    }

    fn flush(&self) -> Result<(), AppError> {
        self.inner.write()
    }
}
