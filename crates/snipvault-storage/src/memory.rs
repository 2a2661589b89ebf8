//! In-memory storage implementation for testing.

use crate::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-memory storage. Values are kept as JSON strings so that
/// serialization behaves exactly like [`crate::JsonStorage`].
#[derive(Default)]
pub struct MemoryStorage {
    data: RwLock<BTreeMap<Vec<String>, String>>,
}

impl MemoryStorage {
    /// Create a new in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    fn owned_key(key: &[&str]) -> StorageResult<Vec<String>> {
        if key.is_empty() {
            return Err(StorageError::invalid_key("Key cannot be empty"));
        }
        Ok(key.iter().map(|s| s.to_string()).collect())
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::LockPoisoned(e.to_string())
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn read<T: DeserializeOwned + Send>(&self, key: &[&str]) -> StorageResult<Option<T>> {
        let key = Self::owned_key(key)?;
        let data = self.data.read().map_err(poisoned)?;

        match data.get(&key) {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    async fn write<T: Serialize + Send + Sync>(
        &self,
        key: &[&str],
        value: &T,
    ) -> StorageResult<()> {
        let key = Self::owned_key(key)?;
        let json = serde_json::to_string(value)?;
        self.data.write().map_err(poisoned)?.insert(key, json);
        Ok(())
    }

    async fn remove(&self, key: &[&str]) -> StorageResult<()> {
        let key = Self::owned_key(key)?;
        self.data.write().map_err(poisoned)?.remove(&key);
        Ok(())
    }

    async fn list(&self, prefix: &[&str]) -> StorageResult<Vec<Vec<String>>> {
        let data = self.data.read().map_err(poisoned)?;
        // Only direct children of the prefix, in key order.
        Ok(data
            .keys()
            .filter(|k| {
                k.len() == prefix.len() + 1 && k.iter().zip(prefix).all(|(a, b)| a == b)
            })
            .cloned()
            .collect())
    }

    async fn exists(&self, key: &[&str]) -> StorageResult<bool> {
        let key = Self::owned_key(key)?;
        Ok(self.data.read().map_err(poisoned)?.contains_key(&key))
    }
}
