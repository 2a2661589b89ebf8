//! History manager: commits, history listing and diffs for tracked entities.

use crate::diff::{render_added, unified_diff, DEFAULT_CONTEXT_LINES};
use crate::{
    Commit, ContentStore, EntityLocks, FsContentStore, FsRevisionLog, HistoryEntry, HistoryResult,
    MemoryContentStore, MemoryRevisionLog, RevisionLog,
};
use serde::{Deserialize, Serialize};
use snipvault_util::TimingGuard;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Configuration for the history manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Author recorded on every commit.
    pub author: String,

    /// Unchanged lines shown around each change in diffs.
    pub context_lines: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            author: "snipvault".to_string(),
            context_lines: DEFAULT_CONTEXT_LINES,
        }
    }
}

/// Orchestrates the content store and the revision log.
///
/// Writes to one entity are serialized; writes to different entities and
/// all reads run concurrently. A commit is only appended after its blob has
/// been stored, so every commit a reader can see resolves to content.
pub struct HistoryManager {
    content: Arc<dyn ContentStore>,
    log: Arc<dyn RevisionLog>,
    locks: EntityLocks,
    config: HistoryConfig,
}

impl HistoryManager {
    /// Create a manager over explicit stores.
    pub fn new(
        content: Arc<dyn ContentStore>,
        log: Arc<dyn RevisionLog>,
        config: HistoryConfig,
    ) -> Self {
        Self {
            content,
            log,
            locks: EntityLocks::new(),
            config,
        }
    }

    /// Open a filesystem-backed manager rooted at `root`.
    pub async fn open(root: &Path, config: HistoryConfig) -> HistoryResult<Self> {
        let content = FsContentStore::open(root).await?;
        let log = FsRevisionLog::open(root).await?;
        info!(root = %root.display(), "Opened history store");
        Ok(Self::new(Arc::new(content), Arc::new(log), config))
    }

    /// Create a manager that keeps everything in memory.
    pub fn in_memory(config: HistoryConfig) -> Self {
        Self::new(
            Arc::new(MemoryContentStore::new()),
            Arc::new(MemoryRevisionLog::new()),
            config,
        )
    }

    /// Record `content` as the newest state of `entity_id`.
    pub async fn commit(
        &self,
        entity_id: &str,
        content: &str,
        message: &str,
    ) -> HistoryResult<Commit> {
        let _timing = TimingGuard::history("commit").with_entity(entity_id);
        let _guard = self.locks.lock(entity_id).await;
        self.commit_locked(entity_id, content, message).await
    }

    async fn commit_locked(
        &self,
        entity_id: &str,
        content: &str,
        message: &str,
    ) -> HistoryResult<Commit> {
        let content_ref = self.content.put(content).await?;
        let commit = self
            .log
            .append(entity_id, content_ref, message, &self.config.author)
            .await?;

        // The commit is durable at this point; `latest` only mirrors it.
        if let Err(e) = self.content.set_latest(entity_id, content).await {
            warn!(entity_id, error = %e, "Failed to update latest content");
        }

        info!(
            entity_id,
            commit = %commit.commit_ref.short(),
            sequence = commit.sequence,
            "Recorded commit"
        );
        Ok(commit)
    }

    /// Every recorded state of `entity_id`, oldest first, with content inlined.
    pub async fn history(&self, entity_id: &str) -> HistoryResult<Vec<HistoryEntry>> {
        let _timing = TimingGuard::history("history").with_entity(entity_id);
        let commits = self.log.list(entity_id).await?;

        let mut entries = Vec::with_capacity(commits.len());
        for commit in commits {
            let content = self.content.get(&commit.content_ref).await?;
            entries.push(HistoryEntry::new(commit, content));
        }
        Ok(entries)
    }

    /// Diff of commit `commit_ref` against its parent.
    ///
    /// A root commit renders all of its lines as additions.
    pub async fn diff(&self, entity_id: &str, commit_ref: &str) -> HistoryResult<String> {
        let _timing = TimingGuard::history("diff").with_entity(entity_id);
        let commit = self.log.get(entity_id, commit_ref).await?;
        let new = self.content.get(&commit.content_ref).await?;

        let Some(parent_ref) = &commit.parent_ref else {
            return Ok(render_added(&new));
        };

        let parent = self.log.get(entity_id, parent_ref.as_str()).await?;
        let old = self.content.get(&parent.content_ref).await?;
        Ok(unified_diff(&old, &new, entity_id, self.config.context_lines))
    }

    /// Whether the log holds at least one commit for `entity_id`.
    pub async fn is_tracked(&self, entity_id: &str) -> HistoryResult<bool> {
        Ok(self.log.head(entity_id).await?.is_some())
    }

    /// Record a content change, naming the commit after whether it creates
    /// or updates the entity's history. Returns `false` on failure.
    pub async fn record_change(&self, entity_id: &str, content: &str) -> bool {
        let _guard = self.locks.lock(entity_id).await;

        let message = match self.log.head(entity_id).await {
            Ok(None) => format!("Create snippet: {entity_id}"),
            Ok(Some(_)) => format!("Update snippet: {entity_id}"),
            Err(e) => {
                error!(entity_id, error = %e, "Failed to read history head");
                return false;
            }
        };

        match self.commit_locked(entity_id, content, &message).await {
            Ok(_) => true,
            Err(e) => {
                error!(entity_id, error = %e, "Failed to record change");
                false
            }
        }
    }

    /// History of `entity_id`; empty if untracked or unreadable.
    pub async fn list_changes(&self, entity_id: &str) -> Vec<HistoryEntry> {
        self.history(entity_id).await.unwrap_or_else(|e| {
            error!(entity_id, error = %e, "Failed to list changes");
            Vec::new()
        })
    }

    /// Diff of a commit, or `None` if it cannot be produced.
    pub async fn compute_diff(&self, entity_id: &str, commit_ref: &str) -> Option<String> {
        match self.diff(entity_id, commit_ref).await {
            Ok(diff) => Some(diff),
            Err(e) if e.is_not_found() => {
                debug!(entity_id, commit_ref, "Commit not found for diff");
                None
            }
            Err(e) => {
                warn!(entity_id, commit_ref, error = %e, "Failed to compute diff");
                None
            }
        }
    }

    /// Tracked state of `entity_id`; `false` if the log cannot be read.
    pub async fn check_tracked(&self, entity_id: &str) -> bool {
        self.is_tracked(entity_id).await.unwrap_or_else(|e| {
            error!(entity_id, error = %e, "Failed to check tracked state");
            false
        })
    }
}
