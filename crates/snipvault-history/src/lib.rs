//! Version history for snipvault snippets.
//!
//! Each tracked snippet owns a linear chain of commits:
//! - the [`ContentStore`] keeps immutable text blobs addressed by SHA-256
//! - the [`RevisionLog`] appends commits that reference those blobs
//! - the [`HistoryManager`] ties both together and renders diffs
//!
//! # Example
//!
//! ```no_run
//! use snipvault_history::{HistoryConfig, HistoryManager};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let history = HistoryManager::open(Path::new("data/history"), HistoryConfig::default()).await?;
//!
//! history.commit("snp_01hq", "- [ ] buy milk", "Create snippet: snp_01hq").await?;
//! let second = history.commit("snp_01hq", "- [x] buy milk", "Update snippet: snp_01hq").await?;
//!
//! let diff = history.diff("snp_01hq", second.commit_ref.as_str()).await?;
//! assert!(diff.contains("+- [x] buy milk"));
//! # Ok(())
//! # }
//! ```

mod commit;
mod content;
pub mod diff;
mod error;
mod lock;
mod manager;
mod revlog;

pub use commit::{
    normalize_ref, resolve_ref, verify_chain, Commit, CommitRef, ContentRef, HistoryEntry,
    MIN_ABBREV_LEN,
};
pub use content::{ContentStore, FsContentStore, MemoryContentStore};
pub use error::{HistoryError, HistoryResult};
pub use lock::EntityLocks;
pub use manager::{HistoryConfig, HistoryManager};
pub use revlog::{FsRevisionLog, MemoryRevisionLog, RevisionLog};
