//! Key-value persistence used by the history and preference stores.
//!
//! Stores are injected as `Arc<dyn KeyValueStore>`; the engine only ever needs
//! get/set/remove of string values under a handful of fixed keys. A
//! [`WriteQueue`] serializes read-modify-write cycles per key so two concurrent
//! updates to the same list cannot drop each other.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Store trait and keys
// ---------------------------------------------------------------------------

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// The fixed logical keys the engine persists under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    RecentSearches,
    SavedSearches,
    SearchPreferences,
}

impl StoreKey {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreKey::RecentSearches => "recent_searches",
            StoreKey::SavedSearches => "saved_searches",
            StoreKey::SearchPreferences => "search_preferences",
        }
    }
}

/// Read and decode a JSON record, falling back to `T::default()` when the key
/// is missing, unreadable, or corrupt.
pub(crate) async fn load_or_default<T>(store: &dyn KeyValueStore, key: StoreKey) -> T
where
    T: DeserializeOwned + Default,
{
    match store.get(key.as_str()).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = key.as_str(), error = %e, "Corrupt record, using default");
                T::default()
            }
        },
        Ok(None) => T::default(),
        Err(e) => {
            warn!(key = key.as_str(), error = %e, "Could not read record, using default");
            T::default()
        }
    }
}

pub(crate) async fn store_json<T>(
    store: &dyn KeyValueStore,
    key: StoreKey,
    value: &T,
) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    store.set(key.as_str(), raw).await
}

// ---------------------------------------------------------------------------
// Per-key write serialization
// ---------------------------------------------------------------------------

/// One async mutex per key. Hold the guard across load + persist.
#[derive(Default)]
pub struct WriteQueue {
    locks: DashMap<&'static str, Arc<tokio::sync::Mutex<()>>>,
}

impl WriteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: StoreKey) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(&*self.locks.entry(key.as_str()).or_default());
        lock.lock_owned().await
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store. Contents vanish with the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// One `<key>.json` file per key inside a data directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::Unavailable(format!("invalid store key '{key}'")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        // Write-then-rename so readers never see a partial record. Each write
        // gets its own temp file so overlapping writers cannot move each
        // other's.
        let tmp = self.dir.join(format!(".{key}.{}.tmp", Uuid::now_v7().simple()));
        if let Err(e) = tokio::fs::write(&tmp, value.as_bytes()).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!(key, path = %path.display(), "Wrote record");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
