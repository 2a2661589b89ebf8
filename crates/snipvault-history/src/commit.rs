//! Commit data structures and reference types.

use crate::{HistoryError, HistoryResult};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Shortest accepted abbreviation of a commit reference.
pub const MIN_ABBREV_LEN: usize = 7;

/// Hex-encoded SHA-256 of the given parts, each terminated by a NUL byte.
pub(crate) fn sha256_hex(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// Reference to an immutable content blob (SHA-256 of its bytes).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentRef(String);

impl ContentRef {
    /// Compute the reference for a piece of content.
    pub fn for_content(content: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Wrap an existing hex reference.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque, repository-wide unique commit identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitRef(String);

impl CommitRef {
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First seven characters, for log output. Refs that do not split at
    /// byte seven are returned whole.
    pub fn short(&self) -> &str {
        self.0.get(..MIN_ABBREV_LEN).unwrap_or(&self.0)
    }
}

impl std::fmt::Display for CommitRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One recorded state of an entity's content, linked to its predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    #[serde(rename = "ref")]
    pub commit_ref: CommitRef,

    /// Entity this commit belongs to.
    pub entity_id: String,

    /// Zero-based position in the entity's chain. Authoritative for order.
    pub sequence: u64,

    pub message: String,

    pub author: String,

    pub timestamp: DateTime<Utc>,

    pub content_ref: ContentRef,

    /// Previous commit of the same entity; `None` for the first commit.
    #[serde(default)]
    pub parent_ref: Option<CommitRef>,
}

impl Commit {
    /// Build a commit, deriving its reference from every other field.
    pub fn new(
        entity_id: impl Into<String>,
        sequence: u64,
        parent_ref: Option<CommitRef>,
        content_ref: ContentRef,
        message: impl Into<String>,
        author: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let mut commit = Self {
            commit_ref: CommitRef(String::new()),
            entity_id: entity_id.into(),
            sequence,
            message: message.into(),
            author: author.into(),
            timestamp,
            content_ref,
            parent_ref,
        };
        commit.commit_ref = commit.compute_ref();
        commit
    }

    /// Build the next commit on top of `head` (or the first one).
    pub fn next(
        entity_id: &str,
        head: Option<&Commit>,
        content_ref: ContentRef,
        message: &str,
        author: &str,
    ) -> Self {
        let (sequence, parent_ref) = match head {
            Some(head) => (head.sequence + 1, Some(head.commit_ref.clone())),
            None => (0, None),
        };
        Self::new(
            entity_id,
            sequence,
            parent_ref,
            content_ref,
            message,
            author,
            Utc::now(),
        )
    }

    /// Recompute the reference from the commit's fields.
    pub fn compute_ref(&self) -> CommitRef {
        let sequence = self.sequence.to_string();
        let timestamp = self.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true);
        let parent = self.parent_ref.as_ref().map(|p| p.as_str()).unwrap_or("");
        CommitRef(sha256_hex(&[
            self.entity_id.as_bytes(),
            sequence.as_bytes(),
            parent.as_bytes(),
            self.content_ref.as_str().as_bytes(),
            self.author.as_bytes(),
            timestamp.as_bytes(),
            self.message.as_bytes(),
        ]))
    }

    /// Whether this is the first commit of its chain.
    pub fn is_root(&self) -> bool {
        self.parent_ref.is_none()
    }
}

/// A commit with its content resolved, as returned by history queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "ref")]
    pub commit_ref: CommitRef,
    pub message: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub content: String,
}

impl HistoryEntry {
    pub fn new(commit: Commit, content: String) -> Self {
        Self {
            commit_ref: commit.commit_ref,
            message: commit.message,
            author: commit.author,
            timestamp: commit.timestamp,
            content,
        }
    }
}

/// Check that `candidate` looks like a full or abbreviated commit reference
/// and normalize it to lowercase.
pub fn normalize_ref(candidate: &str) -> HistoryResult<String> {
    let candidate = candidate.trim().to_ascii_lowercase();
    if candidate.len() < MIN_ABBREV_LEN || !candidate.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(HistoryError::InvalidRef(candidate));
    }
    Ok(candidate)
}

/// Find the commit matching a full or abbreviated reference.
pub fn resolve_ref<'a>(commits: &'a [Commit], candidate: &str) -> HistoryResult<&'a Commit> {
    let prefix = normalize_ref(candidate)?;
    let mut matches = commits
        .iter()
        .filter(|c| c.commit_ref.as_str().starts_with(&prefix));

    match (matches.next(), matches.next()) {
        (Some(commit), None) => Ok(commit),
        (Some(_), Some(_)) => Err(HistoryError::AmbiguousRef(prefix)),
        (None, _) => Err(HistoryError::not_found(format!("commit {prefix}"))),
    }
}

/// Check that `commits` is a well-formed linear chain for `entity_id`.
pub fn verify_chain(entity_id: &str, commits: &[Commit]) -> HistoryResult<()> {
    let mut parent: Option<&CommitRef> = None;
    for (index, commit) in commits.iter().enumerate() {
        if commit.entity_id != entity_id {
            return Err(HistoryError::corrupted(format!(
                "commit {} belongs to {}, found in chain of {}",
                commit.commit_ref, commit.entity_id, entity_id
            )));
        }
        if commit.sequence != index as u64 || commit.parent_ref.as_ref() != parent {
            return Err(HistoryError::corrupted(format!(
                "commit {} of {} is out of chain order",
                commit.commit_ref, entity_id
            )));
        }
        if commit.compute_ref() != commit.commit_ref {
            return Err(HistoryError::corrupted(format!(
                "commit {} of {} does not match its contents",
                commit.commit_ref, entity_id
            )));
        }
        parent = Some(&commit.commit_ref);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(n: usize) -> Vec<Commit> {
        let mut commits: Vec<Commit> = Vec::new();
        for i in 0..n {
            let content_ref = ContentRef::for_content(&format!("v{i}"));
            let commit = Commit::next("snp_a", commits.last(), content_ref, "edit", "tester");
            commits.push(commit);
        }
        commits
    }

    #[test]
    fn test_content_ref_is_sha256() {
        let r = ContentRef::for_content("");
        assert_eq!(
            r.as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_next_links_to_head() {
        let commits = chain(3);
        assert!(commits[0].is_root());
        assert_eq!(commits[1].parent_ref.as_ref(), Some(&commits[0].commit_ref));
        assert_eq!(commits[2].sequence, 2);
        verify_chain("snp_a", &commits).unwrap();
    }

    #[test]
    fn test_refs_differ_for_same_content() {
        let a = Commit::next("snp_a", None, ContentRef::for_content("x"), "m", "t");
        let b = Commit::next("snp_b", None, ContentRef::for_content("x"), "m", "t");
        assert_ne!(a.commit_ref, b.commit_ref);
    }

    #[test]
    fn test_short_ref() {
        assert_eq!(CommitRef::from_hex("0123456789abcdef").short(), "0123456");
        assert_eq!(CommitRef::from_hex("abc").short(), "abc");
        assert_eq!(CommitRef::from_hex("abcdeféf").short(), "abcdeféf");
        assert_eq!(CommitRef::from_hex("ééééé").short(), "ééééé");
    }

    #[test]
    fn test_serde_preserves_ref() {
        let commit = chain(2).pop().unwrap();
        let json = serde_json::to_string(&commit).unwrap();
        assert!(json.contains("\"ref\""));
        let parsed: Commit = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, commit);
        assert_eq!(parsed.compute_ref(), parsed.commit_ref);
    }

    #[test]
    fn test_resolve_full_and_abbreviated() {
        let commits = chain(3);
        let target = &commits[1];
        let full = resolve_ref(&commits, target.commit_ref.as_str()).unwrap();
        assert_eq!(full, target);
        let short = resolve_ref(&commits, target.commit_ref.short()).unwrap();
        assert_eq!(short, target);
        let upper = target.commit_ref.as_str().to_ascii_uppercase();
        assert_eq!(resolve_ref(&commits, &upper).unwrap(), target);
    }

    #[test]
    fn test_resolve_rejects_bad_refs() {
        let commits = chain(1);
        assert!(matches!(
            resolve_ref(&commits, "abc"),
            Err(HistoryError::InvalidRef(_))
        ));
        assert!(matches!(
            resolve_ref(&commits, "not-a-hash"),
            Err(HistoryError::InvalidRef(_))
        ));
        assert!(resolve_ref(&commits, "0000000000").unwrap_err().is_not_found());
    }

    #[test]
    fn test_verify_chain_detects_tampering() {
        let mut commits = chain(2);
        commits[1].message = "rewritten".to_string();
        assert!(matches!(
            verify_chain("snp_a", &commits),
            Err(HistoryError::Corrupted(_))
        ));

        let mut commits = chain(3);
        commits.remove(1);
        assert!(verify_chain("snp_a", &commits).is_err());
    }
}
