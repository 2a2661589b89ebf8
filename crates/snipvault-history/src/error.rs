//! History error types.

use thiserror::Error;

/// Result type for history operations.
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Errors that can occur in the content store, revision log or manager.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Commit or content reference does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An abbreviated commit reference matches several commits.
    #[error("Ambiguous commit reference: {0}")]
    AmbiguousRef(String),

    /// A commit reference is not valid hex or is too short.
    #[error("Invalid commit reference: {0}")]
    InvalidRef(String),

    /// Entity id cannot be used as a storage key.
    #[error("Invalid entity id: {0}")]
    InvalidEntityId(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored data failed an integrity check.
    #[error("History storage corrupted: {0}")]
    Corrupted(String),
}

impl HistoryError {
    /// Create a not found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }

    /// Whether this error is a typed absence rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_typed_absence() {
        let err = HistoryError::not_found("commit abc1234");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Not found: commit abc1234");
    }

    #[test]
    fn io_is_not_absence() {
        let err = HistoryError::from(std::io::Error::other("disk full"));
        assert!(!err.is_not_found());
    }
}
