//! File-backed store: one JSON file per key under a data directory.

use super::KeyValueStore;
use crate::error::StorageError;
use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

const EXTENSION: &str = "json";

/// Durable store rooted at a directory.
///
/// Keys are percent-encoded into file names. Writes go to a temp file that is
/// renamed over the target, so a reader never sees a half-written value.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            StorageError::with_source(
                format!("Failed to create data directory {}", dir.display()),
                e,
            )
        })?;
        debug!(dir = %dir.display(), "Opened file store");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", urlencoding::encode(key), EXTENSION))
    }

    fn temp_path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!(".{}.{}.tmp", urlencoding::encode(key), EXTENSION))
    }

    fn key_for(path: &Path) -> Option<String> {
        if path.extension()?.to_str()? != EXTENSION {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        if stem.starts_with('.') {
            return None;
        }
        urlencoding::decode(stem).ok().map(|k| k.into_owned())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let path = self.path_for(key);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::with_source(
                    format!("Failed to get item with key \"{}\"", key),
                    e,
                ));
            }
        };
        serde_json::from_str(&text).map(Some).map_err(|e| {
            StorageError::with_source(format!("Failed to get item with key \"{}\"", key), e)
        })
    }

    async fn set(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let fail = |e: std::io::Error| {
            StorageError::with_source(format!("Failed to set item with key \"{}\"", key), e)
        };
        let text = serde_json::to_string(value).map_err(|e| {
            StorageError::with_source(format!("Failed to set item with key \"{}\"", key), e)
        })?;

        let temp = self.temp_path_for(key);
        tokio::fs::write(&temp, text.as_bytes()).await.map_err(fail)?;
        tokio::fs::rename(&temp, self.path_for(key))
            .await
            .map_err(fail)?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::with_source(
                format!("Failed to remove item with key \"{}\"", key),
                e,
            )),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let fail = |e: std::io::Error| StorageError::with_source("Failed to get all keys", e);
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(fail)?;
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(fail)? {
            if let Some(key) = Self::key_for(&entry.path()) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn clear(&self) -> Result<(), StorageError> {
        for key in self.keys().await? {
            self.remove(&key)
                .await
                .map_err(|e| StorageError::with_source("Failed to clear storage", e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TASKS_KEY;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        store.set(TASKS_KEY, &json!([{"id": "1"}])).await.unwrap();

        let reopened = FileStore::open(dir.path()).await.unwrap();
        assert_eq!(
            reopened.get(TASKS_KEY).await.unwrap(),
            Some(json!([{"id": "1"}]))
        );
    }

    #[tokio::test]
    async fn test_namespaced_key_maps_to_safe_file_name() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        store.set(TASKS_KEY, &json!([])).await.unwrap();

        let path = store.path_for(TASKS_KEY);
        assert!(path.exists());
        assert_eq!(path.parent(), Some(dir.path()));
        assert_eq!(store.keys().await.unwrap(), vec![TASKS_KEY.to_string()]);
    }

    #[tokio::test]
    async fn test_missing_and_remove() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        assert_eq!(store.get("nope").await.unwrap(), None);
        store.remove("nope").await.unwrap();

        store.set("k", &json!(1)).await.unwrap();
        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_leaves_foreign_files() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        store.set("a", &json!(1)).await.unwrap();
        store.set("b", &json!(2)).await.unwrap();
        std::fs::write(dir.path().join("README.txt"), "hi").unwrap();

        store.clear().await.unwrap();
        assert!(store.keys().await.unwrap().is_empty());
        assert!(dir.path().join("README.txt").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        std::fs::write(store.path_for("bad"), "{oops").unwrap();
        let err = store.get("bad").await.unwrap_err();
        assert!(err.message().contains("bad"));
    }
}
