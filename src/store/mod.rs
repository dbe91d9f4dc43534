//! Durable key-value persistence.
//!
//! Values are JSON documents stored whole under a string key. The task
//! collection lives under [`TASKS_KEY`] as a JSON array.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StorageError;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Key under which the task collection is persisted.
pub const TASKS_KEY: &str = "@todo_cache:todos";

/// Whole-value get/set persistence.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`, `None` if nothing is stored.
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Replace the value under `key`.
    async fn set(&self, key: &str, value: &Value) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// All keys currently stored.
    async fn keys(&self) -> Result<Vec<String>, StorageError>;

    /// Remove every key.
    async fn clear(&self) -> Result<(), StorageError>;
}

/// Read and decode a typed value.
pub async fn get_item<T, S>(store: &S, key: &str) -> Result<Option<T>, StorageError>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match store.get(key).await? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StorageError::with_source(format!("Failed to decode item with key \"{}\"", key), e)),
        None => Ok(None),
    }
}

/// Encode and write a typed value.
pub async fn set_item<T, S>(store: &S, key: &str, value: &T) -> Result<(), StorageError>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let value = serde_json::to_value(value).map_err(|e| {
        StorageError::with_source(format!("Failed to encode item with key \"{}\"", key), e)
    })?;
    store.set(key, &value).await
}
