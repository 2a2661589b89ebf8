//! Snippet service: CRUD with history recording.

use crate::config::Config;
use crate::error::{CoreResult, SnippetError};
use crate::snippet::{Snippet, SnippetRepository};
use snipvault_history::{EntityLocks, HistoryEntry, HistoryManager};
use snipvault_storage::{JsonStorage, Storage};
use snipvault_util::Identifier;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Snippet operations shared by the HTTP API and the CLI.
///
/// The name check and the record save run under one short service-wide
/// lock so two snippets can never end up with the same name. Saving a
/// record and recording its change hold a per-snippet lock, so history
/// follows save order and writes to different snippets commit in parallel.
pub struct SnippetService<S = JsonStorage> {
    repo: SnippetRepository<S>,
    history: Arc<HistoryManager>,
    write_lock: Mutex<()>,
    locks: EntityLocks,
}

impl SnippetService<JsonStorage> {
    /// Open the on-disk service rooted at the configured data directory.
    pub async fn open(config: &Config) -> CoreResult<Self> {
        let data_dir = config.data_dir()?;
        tokio::fs::create_dir_all(&data_dir).await?;

        let history = HistoryManager::open(
            &snipvault_util::path::history_dir(&data_dir),
            config.history_config(),
        )
        .await?;
        info!(data_dir = %data_dir.display(), "Opened snippet store");

        Ok(Self::new(JsonStorage::new(data_dir), Arc::new(history)))
    }
}

impl<S: Storage> SnippetService<S> {
    pub fn new(storage: S, history: Arc<HistoryManager>) -> Self {
        Self {
            repo: SnippetRepository::new(storage),
            history,
            write_lock: Mutex::new(()),
            locks: EntityLocks::new(),
        }
    }

    pub fn history_manager(&self) -> &Arc<HistoryManager> {
        &self.history
    }

    /// Create a snippet. A tracked snippet gets its first commit right away.
    pub async fn create(&self, name: &str, content: &str, tracking: bool) -> CoreResult<Snippet> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SnippetError::validation("Name is required").into());
        }

        let snippet = Snippet::new(name, content, tracking);
        let _entity = self.locks.lock(&snippet.id).await;
        {
            let _guard = self.write_lock.lock().await;
            if self.repo.find_by_name(name).await?.is_some() {
                return Err(SnippetError::NameTaken {
                    name: name.to_string(),
                }
                .into());
            }
            self.repo.save(&snippet).await?;
        }
        info!(id = %snippet.id, name = %snippet.name, tracking, "Created snippet");

        if tracking {
            self.track(&snippet).await;
        }
        Ok(snippet)
    }

    pub async fn get(&self, id: &str) -> CoreResult<Snippet> {
        self.repo.get(id).await
    }

    /// All snippets, sorted by name.
    pub async fn list(&self) -> CoreResult<Vec<Snippet>> {
        self.repo.list().await
    }

    /// Replace a snippet's content and optionally rename it.
    ///
    /// A blank `name` leaves the name unchanged. Every write of a tracked
    /// snippet is recorded, even when the content is unchanged.
    pub async fn update(&self, id: &str, name: Option<&str>, content: &str) -> CoreResult<Snippet> {
        if Identifier::parse(id).is_none() {
            return Err(SnippetError::not_found(id).into());
        }

        let _entity = self.locks.lock(id).await;
        let snippet = {
            let _guard = self.write_lock.lock().await;
            let mut snippet = self.repo.get(id).await?;

            if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
                if name != snippet.name {
                    if self.repo.find_by_name(name).await?.is_some() {
                        return Err(SnippetError::NameTaken {
                            name: name.to_string(),
                        }
                        .into());
                    }
                    debug!(id, from = %snippet.name, to = name, "Renaming snippet");
                    snippet.name = name.to_string();
                }
            }

            snippet.content = content.to_string();
            snippet.touch();
            self.repo.save(&snippet).await?;
            snippet
        };
        info!(id, name = %snippet.name, "Updated snippet");

        if snippet.tracking {
            self.track(&snippet).await;
        }
        Ok(snippet)
    }

    /// Delete a snippet record. Its history is kept.
    pub async fn delete(&self, id: &str) -> CoreResult<()> {
        let _guard = self.write_lock.lock().await;
        if !self.repo.delete(id).await? {
            return Err(SnippetError::not_found(id).into());
        }
        info!(id, "Deleted snippet");
        Ok(())
    }

    /// Recorded versions of a snippet, oldest first.
    pub async fn history(&self, id: &str) -> CoreResult<Vec<HistoryEntry>> {
        let snippet = self.repo.get(id).await?;
        Ok(self.history.list_changes(&snippet.id).await)
    }

    /// Diff introduced by `commit_ref`, `None` if the commit is unknown.
    pub async fn diff(&self, id: &str, commit_ref: &str) -> CoreResult<Option<String>> {
        let snippet = self.repo.get(id).await?;
        Ok(self.history.compute_diff(&snippet.id, commit_ref).await)
    }

    /// Whether the snippet has any recorded history.
    pub async fn is_tracked(&self, id: &str) -> CoreResult<bool> {
        let snippet = self.repo.get(id).await?;
        Ok(self.history.check_tracked(&snippet.id).await)
    }

    async fn track(&self, snippet: &Snippet) {
        if !self
            .history
            .record_change(&snippet.id, &snippet.content)
            .await
        {
            warn!(id = %snippet.id, "Snippet saved but its change was not recorded in history");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use snipvault_history::{
        ContentRef, ContentStore, HistoryConfig, HistoryResult, MemoryContentStore,
        MemoryRevisionLog,
    };
    use snipvault_storage::MemoryStorage;
    use std::time::{Duration, Instant};

    fn service() -> SnippetService<MemoryStorage> {
        SnippetService::new(
            MemoryStorage::new(),
            Arc::new(HistoryManager::in_memory(HistoryConfig::default())),
        )
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let service = service();
        let err = service.create("   ", "x", false).await.unwrap_err();
        assert!(err.is_invalid_input());
        assert_eq!(err.to_string(), "Name is required");
    }

    #[tokio::test]
    async fn test_duplicate_names_rejected() {
        let service = service();
        let first = service.create("todo", "", false).await.unwrap();
        assert!(service.create("todo", "", false).await.unwrap_err().is_invalid_input());

        let other = service.create("notes", "", false).await.unwrap();
        let err = service
            .update(&other.id, Some("todo"), "")
            .await
            .unwrap_err();
        assert!(err.is_invalid_input());

        // Renaming to its own name is fine.
        service.update(&first.id, Some("todo"), "x").await.unwrap();
    }

    #[tokio::test]
    async fn test_tracked_snippet_records_changes() {
        let service = service();
        let snippet = service.create("todo", "- [ ] buy milk", true).await.unwrap();
        service
            .update(&snippet.id, None, "- [x] buy milk")
            .await
            .unwrap();

        let history = service.history(&snippet.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].message, format!("Create snippet: {}", snippet.id));
        assert_eq!(history[1].message, format!("Update snippet: {}", snippet.id));

        let diff = service
            .diff(&snippet.id, history[1].commit_ref.as_str())
            .await
            .unwrap()
            .unwrap();
        assert!(diff.contains("-- [ ] buy milk\n"));
        assert!(diff.contains("+- [x] buy milk\n"));
        assert!(service.is_tracked(&snippet.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_unchanged_content_still_records_a_commit() {
        let service = service();
        let snippet = service.create("todo", "same", true).await.unwrap();
        service.update(&snippet.id, Some("renamed"), "same").await.unwrap();

        let history = service.history(&snippet.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].message, format!("Update snippet: {}", snippet.id));
        assert_eq!(history[1].content, "same");
        assert_eq!(
            service
                .diff(&snippet.id, history[1].commit_ref.as_str())
                .await
                .unwrap()
                .as_deref(),
            Some("")
        );
        assert_eq!(service.get(&snippet.id).await.unwrap().name, "renamed");
    }

    /// Content store that takes a fixed time for every write.
    struct SlowContent {
        inner: MemoryContentStore,
        delay: Duration,
    }

    #[async_trait]
    impl ContentStore for SlowContent {
        async fn put(&self, content: &str) -> HistoryResult<ContentRef> {
            tokio::time::sleep(self.delay).await;
            self.inner.put(content).await
        }

        async fn get(&self, content_ref: &ContentRef) -> HistoryResult<String> {
            self.inner.get(content_ref).await
        }

        async fn set_latest(&self, entity_id: &str, content: &str) -> HistoryResult<()> {
            self.inner.set_latest(entity_id, content).await
        }

        async fn latest(&self, entity_id: &str) -> HistoryResult<Option<String>> {
            self.inner.latest(entity_id).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_updates_to_different_snippets_commit_in_parallel() {
        let delay = Duration::from_millis(300);
        let history = HistoryManager::new(
            Arc::new(SlowContent {
                inner: MemoryContentStore::new(),
                delay,
            }),
            Arc::new(MemoryRevisionLog::new()),
            HistoryConfig::default(),
        );
        let service = SnippetService::new(MemoryStorage::new(), Arc::new(history));
        let a = service.create("a", "a1", true).await.unwrap();
        let b = service.create("b", "b1", true).await.unwrap();

        let start = Instant::now();
        let (ra, rb) = tokio::join!(
            service.update(&a.id, None, "a2"),
            service.update(&b.id, None, "b2"),
        );
        ra.unwrap();
        rb.unwrap();
        assert!(
            start.elapsed() < delay * 2,
            "updates ran one after another: {:?}",
            start.elapsed()
        );

        assert_eq!(service.history(&a.id).await.unwrap().len(), 2);
        assert_eq!(service.history(&b.id).await.unwrap().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_to_one_snippet_follow_save_order() {
        let service = Arc::new(service());
        let snippet = service.create("todo", "v0", true).await.unwrap();

        let handles: Vec<_> = (1..=8)
            .map(|i| {
                let service = service.clone();
                let id = snippet.id.clone();
                tokio::spawn(async move { service.update(&id, None, &format!("v{i}")).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let history = service.history(&snippet.id).await.unwrap();
        assert_eq!(history.len(), 9);
        let saved = service.get(&snippet.id).await.unwrap();
        assert_eq!(history.last().unwrap().content, saved.content);
    }

    #[tokio::test]
    async fn test_untracked_snippet_has_no_history() {
        let service = service();
        let snippet = service.create("scratch", "a", false).await.unwrap();
        service.update(&snippet.id, None, "b").await.unwrap();

        assert!(service.history(&snippet.id).await.unwrap().is_empty());
        assert!(!service.is_tracked(&snippet.id).await.unwrap());
        assert_eq!(service.diff(&snippet.id, "abcdef0").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_snippet() {
        let service = service();
        assert!(service.get("snp_missing").await.unwrap_err().is_not_found());
        assert!(service.update("snp_missing", None, "x").await.unwrap_err().is_not_found());
        assert!(service.delete("snp_missing").await.unwrap_err().is_not_found());
        assert!(service.history("snp_missing").await.unwrap_err().is_not_found());
        assert!(service.is_tracked("snp_missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_keeps_history() {
        let service = service();
        let snippet = service.create("todo", "x", true).await.unwrap();
        service.delete(&snippet.id).await.unwrap();

        assert!(service.get(&snippet.id).await.unwrap_err().is_not_found());
        assert!(service.history_manager().check_tracked(&snippet.id).await);
    }
}
