//! Snippet records and their repository.

use crate::error::{CoreResult, SnippetError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snipvault_storage::Storage;
use snipvault_util::Identifier;

/// A named block of text, optionally with tracked history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    /// Unique identifier (`snp_<ulid>`).
    pub id: String,

    /// Display name, unique across snippets.
    pub name: String,

    /// Current content.
    pub content: String,

    /// Whether content changes are recorded in history.
    #[serde(default)]
    pub tracking: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Snippet {
    /// Create a new snippet with a fresh id.
    pub fn new(name: impl Into<String>, content: impl Into<String>, tracking: bool) -> Self {
        let now = Utc::now();
        Self {
            id: Identifier::snippet(),
            name: name.into(),
            content: content.into(),
            tracking,
            created_at: now,
            updated_at: now,
        }
    }

    /// Update the modification time.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Snippet repository for CRUD operations.
pub struct SnippetRepository<S> {
    storage: S,
}

impl<S: Storage> SnippetRepository<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Save a snippet, replacing any previous version.
    pub async fn save(&self, snippet: &Snippet) -> CoreResult<()> {
        self.storage.write(&["snippets", snippet.id.as_str()], snippet).await?;
        Ok(())
    }

    /// Get a snippet by ID.
    pub async fn get(&self, id: &str) -> CoreResult<Snippet> {
        self.find(id)
            .await?
            .ok_or_else(|| SnippetError::not_found(id).into())
    }

    /// Get a snippet by ID, `None` if it does not exist.
    pub async fn find(&self, id: &str) -> CoreResult<Option<Snippet>> {
        if Identifier::parse(id).is_none() {
            return Ok(None);
        }
        Ok(self.storage.read(&["snippets", id]).await?)
    }

    /// Delete a snippet. Returns whether it existed.
    pub async fn delete(&self, id: &str) -> CoreResult<bool> {
        if Identifier::parse(id).is_none() {
            return Ok(false);
        }
        let key = ["snippets", id];
        if !self.storage.exists(&key).await? {
            return Ok(false);
        }
        self.storage.remove(&key).await?;
        Ok(true)
    }

    /// List all snippets, sorted by name.
    pub async fn list(&self) -> CoreResult<Vec<Snippet>> {
        let keys = self.storage.list(&["snippets"]).await?;

        let mut snippets = Vec::with_capacity(keys.len());
        for key in keys {
            let key_refs: Vec<&str> = key.iter().map(|s| s.as_str()).collect();
            if let Some(snippet) = self.storage.read::<Snippet>(&key_refs).await? {
                snippets.push(snippet);
            }
        }

        snippets.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(snippets)
    }

    /// Find a snippet by exact name.
    pub async fn find_by_name(&self, name: &str) -> CoreResult<Option<Snippet>> {
        Ok(self.list().await?.into_iter().find(|s| s.name == name))
    }
}
