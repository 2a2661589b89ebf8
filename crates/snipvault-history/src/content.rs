//! Content store: immutable text blobs addressed by their SHA-256.

use crate::{ContentRef, HistoryError, HistoryResult};
use async_trait::async_trait;
use snipvault_util::path::is_safe_component;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};

/// Persists text blobs and resolves them by reference.
///
/// `get` must be referentially transparent: one `ContentRef` always yields
/// the same bytes.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Durably store `content` and return its reference.
    async fn put(&self, content: &str) -> HistoryResult<ContentRef>;

    /// Return the exact content previously stored under `content_ref`.
    async fn get(&self, content_ref: &ContentRef) -> HistoryResult<String>;

    /// Mark `content` as the latest recorded state of `entity_id`.
    ///
    /// Called once the commit holding `content` is in the revision log.
    async fn set_latest(&self, entity_id: &str, content: &str) -> HistoryResult<()>;

    /// Latest recorded content of an entity, if any.
    async fn latest(&self, entity_id: &str) -> HistoryResult<Option<String>>;
}

/// Filesystem content store.
///
/// ```text
/// root/
///   objects/<aa>/<62 hex>    # blob, named by content hash
///   latest/<entity_id>.txt   # content of the entity's newest commit
///   tmp/                     # staging area for atomic writes
/// ```
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    /// Open (and create if needed) a content store under `root`.
    pub async fn open(root: impl Into<PathBuf>) -> HistoryResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("objects")).await?;
        fs::create_dir_all(root.join("latest")).await?;
        fs::create_dir_all(root.join("tmp")).await?;
        Ok(Self { root })
    }

    fn blob_path(&self, content_ref: &ContentRef) -> HistoryResult<PathBuf> {
        let hex = content_ref.as_str();
        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(HistoryError::not_found(format!("content {hex}")));
        }
        Ok(self.root.join("objects").join(&hex[..2]).join(&hex[2..]))
    }

    fn latest_path(&self, entity_id: &str) -> HistoryResult<PathBuf> {
        if !is_safe_component(entity_id) {
            return Err(HistoryError::InvalidEntityId(entity_id.to_string()));
        }
        Ok(self.root.join("latest").join(format!("{entity_id}.txt")))
    }

    /// Write `bytes` to `target` via a synced temp file and a rename.
    async fn write_atomic(&self, target: &Path, bytes: &[u8]) -> HistoryResult<()> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.root.join("tmp").join(ulid::Ulid::new().to_string());
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);

        if let Err(e) = fs::rename(&temp_path, target).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn put(&self, content: &str) -> HistoryResult<ContentRef> {
        let content_ref = ContentRef::for_content(content);
        let blob_path = self.blob_path(&content_ref)?;

        if fs::try_exists(&blob_path).await? {
            trace!(content_ref = %content_ref, "Blob already stored");
        } else {
            self.write_atomic(&blob_path, content.as_bytes()).await?;
            debug!(content_ref = %content_ref, bytes = content.len(), "Stored blob");
        }
        Ok(content_ref)
    }

    async fn get(&self, content_ref: &ContentRef) -> HistoryResult<String> {
        let path = self.blob_path(content_ref)?;
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(HistoryError::not_found(format!("content {content_ref}")));
            }
            Err(e) => return Err(e.into()),
        };

        if ContentRef::for_content(&content) != *content_ref {
            return Err(HistoryError::corrupted(format!(
                "blob {content_ref} does not match its hash"
            )));
        }
        Ok(content)
    }

    async fn set_latest(&self, entity_id: &str, content: &str) -> HistoryResult<()> {
        let path = self.latest_path(entity_id)?;
        self.write_atomic(&path, content.as_bytes()).await
    }

    async fn latest(&self, entity_id: &str) -> HistoryResult<Option<String>> {
        let path = self.latest_path(entity_id)?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory content store for tests and ephemeral servers.
#[derive(Default)]
pub struct MemoryContentStore {
    blobs: RwLock<HashMap<ContentRef, Arc<str>>>,
    latest: RwLock<HashMap<String, ContentRef>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct blobs held.
    pub fn blob_count(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or_default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> HistoryError {
    HistoryError::Io(std::io::Error::other(format!("lock poisoned: {e}")))
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, content: &str) -> HistoryResult<ContentRef> {
        let content_ref = ContentRef::for_content(content);
        self.blobs
            .write()
            .map_err(poisoned)?
            .entry(content_ref.clone())
            .or_insert_with(|| Arc::from(content));
        Ok(content_ref)
    }

    async fn get(&self, content_ref: &ContentRef) -> HistoryResult<String> {
        self.blobs
            .read()
            .map_err(poisoned)?
            .get(content_ref)
            .map(|blob| blob.to_string())
            .ok_or_else(|| HistoryError::not_found(format!("content {content_ref}")))
    }

    async fn set_latest(&self, entity_id: &str, content: &str) -> HistoryResult<()> {
        let content_ref = self.put(content).await?;
        self.latest
            .write()
            .map_err(poisoned)?
            .insert(entity_id.to_string(), content_ref);
        Ok(())
    }

    async fn latest(&self, entity_id: &str) -> HistoryResult<Option<String>> {
        let content_ref = self.latest.read().map_err(poisoned)?.get(entity_id).cloned();
        match content_ref {
            Some(content_ref) => self.get(&content_ref).await.map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn fs_store() -> (TempDir, FsContentStore) {
        let dir = TempDir::new().unwrap();
        let store = FsContentStore::open(dir.path().join("history")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_fs_put_get_is_byte_exact() {
        let (_dir, store) = fs_store().await;
        for content in ["", "no newline", "trailing\n", "crlf\r\nline\r\n", "ünïcödé ✓\n\n"] {
            let content_ref = store.put(content).await.unwrap();
            assert_eq!(store.get(&content_ref).await.unwrap(), content);
        }
    }

    #[tokio::test]
    async fn test_fs_identical_content_shares_blob() {
        let (dir, store) = fs_store().await;
        let a = store.put("same").await.unwrap();
        let b = store.put("same").await.unwrap();
        assert_eq!(a, b);

        let blob = dir
            .path()
            .join("history/objects")
            .join(&a.as_str()[..2])
            .join(&a.as_str()[2..]);
        assert!(blob.exists());
    }

    #[tokio::test]
    async fn test_fs_latest_is_only_moved_by_set_latest() {
        let (_dir, store) = fs_store().await;
        assert_eq!(store.latest("snp_a").await.unwrap(), None);

        store.put("v1").await.unwrap();
        assert_eq!(store.latest("snp_a").await.unwrap(), None);

        store.set_latest("snp_a", "v1").await.unwrap();
        store.put("v2").await.unwrap();
        assert_eq!(store.latest("snp_a").await.unwrap().as_deref(), Some("v1"));

        store.set_latest("snp_a", "v2").await.unwrap();
        assert_eq!(store.latest("snp_a").await.unwrap().as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_fs_old_refs_survive_new_puts() {
        let (_dir, store) = fs_store().await;
        let v1 = store.put("v1").await.unwrap();
        store.put("v2").await.unwrap();
        assert_eq!(store.get(&v1).await.unwrap(), "v1");
    }

    #[tokio::test]
    async fn test_fs_missing_and_tampered_blobs() {
        let (dir, store) = fs_store().await;
        let missing = ContentRef::for_content("never stored");
        assert!(store.get(&missing).await.unwrap_err().is_not_found());
        assert!(store
            .get(&ContentRef::from_hex("zz"))
            .await
            .unwrap_err()
            .is_not_found());

        let content_ref = store.put("original").await.unwrap();
        let blob = dir
            .path()
            .join("history/objects")
            .join(&content_ref.as_str()[..2])
            .join(&content_ref.as_str()[2..]);
        std::fs::write(blob, "tampered").unwrap();
        assert!(matches!(
            store.get(&content_ref).await,
            Err(HistoryError::Corrupted(_))
        ));
    }

    #[tokio::test]
    async fn test_fs_rejects_unsafe_entity_id() {
        let (_dir, store) = fs_store().await;
        assert!(matches!(
            store.set_latest("../escape", "x").await,
            Err(HistoryError::InvalidEntityId(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_store_dedups() {
        let store = MemoryContentStore::new();
        let a = store.put("same").await.unwrap();
        let b = store.put("same").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.blob_count(), 1);
        assert_eq!(store.get(&a).await.unwrap(), "same");
        assert_eq!(store.latest("snp_b").await.unwrap(), None);

        store.set_latest("snp_b", "same").await.unwrap();
        assert_eq!(store.blob_count(), 1);
        assert_eq!(store.latest("snp_b").await.unwrap().as_deref(), Some("same"));
    }
}
