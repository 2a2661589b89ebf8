//! Revision log: an append-only, linear chain of commits per entity.

use crate::commit::{resolve_ref, verify_chain};
use crate::{Commit, ContentRef, EntityLocks, HistoryError, HistoryResult};
use async_trait::async_trait;
use snipvault_util::path::is_safe_component;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};

/// Ordered commit storage, one chain per entity.
///
/// Enumeration is oldest-first. Appends to one entity are serialized by the
/// implementation, so the chain never forks.
#[async_trait]
pub trait RevisionLog: Send + Sync {
    /// Append a commit whose parent is the current head of the chain.
    ///
    /// An entity with no chain yet gets a root commit.
    async fn append(
        &self,
        entity_id: &str,
        content_ref: ContentRef,
        message: &str,
        author: &str,
    ) -> HistoryResult<Commit>;

    /// Every commit of the entity, oldest first. Empty if never tracked.
    async fn list(&self, entity_id: &str) -> HistoryResult<Vec<Commit>>;

    /// Look up a commit by full or abbreviated reference.
    async fn get(&self, entity_id: &str, commit_ref: &str) -> HistoryResult<Commit> {
        let commits = self.list(entity_id).await?;
        resolve_ref(&commits, commit_ref).cloned()
    }

    /// Latest commit of the entity.
    async fn head(&self, entity_id: &str) -> HistoryResult<Option<Commit>> {
        Ok(self.list(entity_id).await?.pop())
    }
}

/// A chain read back from disk.
struct LoadedChain {
    commits: Vec<Commit>,
    /// Length of the file up to the last complete line.
    valid_len: u64,
    /// Whether a partial trailing line was found past `valid_len`.
    torn_tail: bool,
}

/// JSON-lines revision log.
///
/// ```text
/// root/
///   log/<entity_id>.jsonl    # one serialized commit per line, oldest first
/// ```
///
/// Each append writes one line and syncs it. A line without its trailing
/// newline is a write that never completed; it is ignored when reading and
/// cut off before the next append.
pub struct FsRevisionLog {
    root: PathBuf,
    locks: EntityLocks,
}

impl FsRevisionLog {
    /// Open (and create if needed) a revision log under `root`.
    pub async fn open(root: impl Into<PathBuf>) -> HistoryResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("log")).await?;
        Ok(Self {
            root,
            locks: EntityLocks::new(),
        })
    }

    fn chain_path(&self, entity_id: &str) -> HistoryResult<PathBuf> {
        if !is_safe_component(entity_id) {
            return Err(HistoryError::InvalidEntityId(entity_id.to_string()));
        }
        Ok(self.root.join("log").join(format!("{entity_id}.jsonl")))
    }

    async fn load(entity_id: &str, path: &Path) -> HistoryResult<LoadedChain> {
        let raw = match fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LoadedChain {
                    commits: Vec::new(),
                    valid_len: 0,
                    torn_tail: false,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let valid_len = raw
            .iter()
            .rposition(|&b| b == b'\n')
            .map(|pos| pos + 1)
            .unwrap_or(0);
        let torn_tail = valid_len < raw.len();
        if torn_tail {
            warn!(
                entity_id,
                bytes = raw.len() - valid_len,
                "Ignoring incomplete trailing commit record"
            );
        }

        let mut commits = Vec::new();
        for (index, line) in raw[..valid_len].split(|&b| b == b'\n').enumerate() {
            if line.is_empty() {
                continue;
            }
            let commit: Commit = serde_json::from_slice(line).map_err(|e| {
                HistoryError::corrupted(format!(
                    "unreadable commit record {} for {}: {}",
                    index + 1,
                    entity_id,
                    e
                ))
            })?;
            commits.push(commit);
        }
        verify_chain(entity_id, &commits)?;

        Ok(LoadedChain {
            commits,
            valid_len: valid_len as u64,
            torn_tail,
        })
    }
}

#[async_trait]
impl RevisionLog for FsRevisionLog {
    async fn append(
        &self,
        entity_id: &str,
        content_ref: ContentRef,
        message: &str,
        author: &str,
    ) -> HistoryResult<Commit> {
        let path = self.chain_path(entity_id)?;
        let _guard = self.locks.lock(entity_id).await;

        let chain = Self::load(entity_id, &path).await?;
        let commit = Commit::next(entity_id, chain.commits.last(), content_ref, message, author);

        let mut line = serde_json::to_vec(&commit)?;
        line.push(b'\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        if chain.torn_tail {
            file.set_len(chain.valid_len).await?;
        }
        append_line(&mut file, &line, chain.valid_len).await?;

        debug!(
            entity_id,
            commit = %commit.commit_ref.short(),
            sequence = commit.sequence,
            "Appended commit"
        );
        Ok(commit)
    }

    async fn list(&self, entity_id: &str) -> HistoryResult<Vec<Commit>> {
        let path = self.chain_path(entity_id)?;
        Ok(Self::load(entity_id, &path).await?.commits)
    }
}

/// The file operations an append needs.
#[async_trait]
trait LogFile: Send {
    async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;
    async fn sync_data(&mut self) -> std::io::Result<()>;
    async fn set_len(&mut self, len: u64) -> std::io::Result<()>;
}

#[async_trait]
impl LogFile for fs::File {
    async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        AsyncWriteExt::write_all(self, buf).await
    }

    async fn sync_data(&mut self) -> std::io::Result<()> {
        fs::File::sync_data(self).await
    }

    async fn set_len(&mut self, len: u64) -> std::io::Result<()> {
        fs::File::set_len(self, len).await
    }
}

/// Write and sync `line`, cutting the file back to `len` if either fails.
///
/// A line that was written but not synced is removed, so a failed append
/// never leaves a commit behind.
async fn append_line<F: LogFile>(file: &mut F, line: &[u8], len: u64) -> HistoryResult<()> {
    let written = match file.write_all(line).await {
        Ok(()) => file.sync_data().await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        if let Err(rollback) = file.set_len(len).await {
            error!(error = %rollback, len, "Failed to roll back partial commit");
        }
        return Err(e.into());
    }
    Ok(())
}

/// In-memory revision log for tests and ephemeral servers.
#[derive(Default)]
pub struct MemoryRevisionLog {
    chains: RwLock<HashMap<String, Vec<Commit>>>,
}

impl MemoryRevisionLog {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> HistoryError {
    HistoryError::Io(std::io::Error::other(format!("lock poisoned: {e}")))
}

#[async_trait]
impl RevisionLog for MemoryRevisionLog {
    async fn append(
        &self,
        entity_id: &str,
        content_ref: ContentRef,
        message: &str,
        author: &str,
    ) -> HistoryResult<Commit> {
        let mut chains = self.chains.write().map_err(poisoned)?;
        let chain = chains.entry(entity_id.to_string()).or_default();
        let commit = Commit::next(entity_id, chain.last(), content_ref, message, author);
        chain.push(commit.clone());
        Ok(commit)
    }

    async fn list(&self, entity_id: &str) -> HistoryResult<Vec<Commit>> {
        Ok(self
            .chains
            .read()
            .map_err(poisoned)?
            .get(entity_id)
            .cloned()
            .unwrap_or_default())
    }
}
