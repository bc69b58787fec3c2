//! Persistent key-value storage for sessions and the local user registry.
//!
//! DESIGN
//! ======
//! Mirrors browser local storage: string keys, string values, synchronous
//! access, enumerable keys. No cross-call locking is offered; concurrent
//! writers get last-writer-wins.
//!
//! `FileStore` keeps the whole map in memory and rewrites a JSON file on
//! every change. Stores here are small (a session blob and a user list), so
//! whole-file rewrites are fine.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store io failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store contents are not a JSON object: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Minimal local-storage contract.
pub trait KeyValueStore: Send + Sync {
    /// All keys currently stored.
    fn keys(&self) -> Result<Vec<String>, StoreError>;
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Remove `key`; removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StoreError>;
}

/// Remove every key starting with `prefix`, returning how many were removed.
///
/// A failure removing one key is logged and skipped so the rest still go.
pub fn remove_prefixed(store: &dyn KeyValueStore, prefix: &str) -> Result<usize, StoreError> {
    let mut removed = 0;
    for key in store.keys()? {
        if !key.starts_with(prefix) {
            continue;
        }
        match store.remove_item(&key) {
            Ok(()) => {
                debug!(%key, "removed persisted auth key");
                removed += 1;
            }
            Err(e) => warn!(error = %e, %key, "failed to remove persisted auth key"),
        }
    }
    Ok(removed)
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Process-local store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.items().keys().cloned().collect())
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.items().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.items().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.items().remove(key);
        Ok(())
    }
}

// =============================================================================
// FILE STORE
// =============================================================================

/// Store backed by a JSON object file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open `path`, starting empty when the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not a
    /// JSON object of strings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let items = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Self { path, items: Mutex::new(items) })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn mutate<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let mut items = self
            .items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // Memory only changes once the file write has succeeded.
        let mut next = items.clone();
        if !f(&mut next) {
            return Ok(());
        }
        let encoded = serde_json::to_vec_pretty(&next)?;
        std::fs::write(&self.path, encoded).map_err(|source| StoreError::Io { path: self.path.clone(), source })?;
        *items = next;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let items = self
            .items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(items.keys().cloned().collect())
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let items = self
            .items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.mutate(|items| {
            items.insert(key.to_owned(), value.to_owned());
            true
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.mutate(|items| items.remove(key).is_some())
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
