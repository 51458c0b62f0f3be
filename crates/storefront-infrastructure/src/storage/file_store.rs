//! File-backed [`DurableStore`].
//!
//! Each key is a file `<dir>/<key>.json`, replaced atomically on every write.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.local/share/storefront/store/
//! ├── cart_items.json              # JSON array of CartItem
//! └── cart_last_modified_at.json   # epoch milliseconds
//! ```

use std::path::{Path, PathBuf};

use storefront_core::cart::DurableStore;
use storefront_core::error::PersistenceError;

use crate::storage::atomic_file::{AtomicFile, StorageError};

/// Durable store that keeps one file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, key: &str) -> Result<AtomicFile, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(AtomicFile::new(self.dir.join(format!("{}.json", key))))
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        self.file_for(key)
            .and_then(|file| file.read())
            .map_err(|e| PersistenceError::Read {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.file_for(key)
            .and_then(|file| file.write(value))
            .map_err(|e| {
                tracing::warn!("[FileStore] Write of '{}' failed: {}", key, e);
                PersistenceError::Write {
                    key: key.to_string(),
                    message: e.to_string(),
                }
            })
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.file_for(key)
            .and_then(|file| file.remove())
            .map_err(|e| PersistenceError::Remove {
                key: key.to_string(),
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_get_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("store"));

        assert_eq!(store.get("cart_items").unwrap(), None);
        store.set("cart_items", "[]").unwrap();
        assert_eq!(store.get("cart_items").unwrap().as_deref(), Some("[]"));
        assert!(temp_dir.path().join("store").join("cart_items.json").exists());

        store.remove("cart_items").unwrap();
        assert_eq!(store.get("cart_items").unwrap(), None);
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());

        assert!(matches!(
            store.set("../escape", "x"),
            Err(PersistenceError::Write { .. })
        ));
        assert!(matches!(store.get(""), Err(PersistenceError::Read { .. })));
    }
}
