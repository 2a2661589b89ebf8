//! Record storage layer for snipvault.
//!
//! Snippet records live behind a small key-value abstraction with two
//! backends:
//! - JSON file storage (default)
//! - In-memory storage (for testing)

pub mod error;
pub mod json;
pub mod memory;

pub use error::{StorageError, StorageResult};
pub use json::JsonStorage;
pub use memory::MemoryStorage;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

/// A trait for key-value record storage backends.
///
/// Keys are path segments, e.g. `["snippets", "snp_01hq..."]`.
/// Values are serialized as JSON.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read a value. Returns `None` if the key doesn't exist.
    async fn read<T: DeserializeOwned + Send>(&self, key: &[&str]) -> StorageResult<Option<T>>;

    /// Write a value, replacing any previous one.
    async fn write<T: Serialize + Send + Sync>(&self, key: &[&str], value: &T)
        -> StorageResult<()>;

    /// Remove a value. Removing a missing key is not an error.
    async fn remove(&self, key: &[&str]) -> StorageResult<()>;

    /// List the keys directly under a prefix.
    async fn list(&self, prefix: &[&str]) -> StorageResult<Vec<Vec<String>>>;

    /// Check if a key exists.
    async fn exists(&self, key: &[&str]) -> StorageResult<bool>;
}
