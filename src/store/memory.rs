//! In-process store, used for tests and throwaway sessions.

use super::KeyValueStore;
use crate::error::StorageError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Holds each value as serialized JSON text so reads see exactly what a
/// durable store would hand back.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed raw JSON text under `key`, bypassing serialization.
    pub fn insert_raw(&self, key: impl Into<String>, json: impl Into<String>) {
        self.entries().insert(key.into(), json.into());
    }

    /// Raw JSON text under `key`.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let Some(text) = self.raw(key) else {
            return Ok(None);
        };
        serde_json::from_str(&text).map(Some).map_err(|e| {
            StorageError::with_source(format!("Failed to get item with key \"{}\"", key), e)
        })
    }

    async fn set(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let text = serde_json::to_string(value).map_err(|e| {
            StorageError::with_source(format!("Failed to set item with key \"{}\"", key), e)
        })?;
        self.entries().insert(key.to_string(), text);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries().remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.entries().keys().cloned().collect())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.entries().clear();
        Ok(())
    }
}
