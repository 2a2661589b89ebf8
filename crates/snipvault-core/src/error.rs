//! Error types for the core crate.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Snippet error.
    #[error("{0}")]
    Snippet(#[from] SnippetError),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] snipvault_storage::StorageError),

    /// History error.
    #[error("history error: {0}")]
    History(#[from] snipvault_history::HistoryError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Whether the error means the requested snippet or commit does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Snippet(SnippetError::NotFound { .. }) => true,
            Self::History(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// Whether the error was caused by the caller's input.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::Snippet(SnippetError::Validation { .. } | SnippetError::NameTaken { .. })
                | Self::History(
                    snipvault_history::HistoryError::InvalidRef(_)
                        | snipvault_history::HistoryError::AmbiguousRef(_)
                )
        )
    }
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid JSON/JSONC syntax.
    #[error("invalid config at {path}: {message}")]
    InvalidJson { path: String, message: String },

    /// Environment variable not found during substitution.
    #[error("environment variable not found: {name}")]
    EnvVarNotFound { name: String },

    /// File reference not found during substitution.
    #[error("file reference not found: {path}")]
    FileRefNotFound { path: String },

    /// Invalid path (e.g., could not determine config directory).
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

/// Snippet-specific errors.
#[derive(Debug, Error)]
pub enum SnippetError {
    /// Snippet not found.
    #[error("snippet not found: {id}")]
    NotFound { id: String },

    /// Another snippet already uses the name.
    #[error("a snippet named \"{name}\" already exists")]
    NameTaken { name: String },

    /// Input rejected before touching storage.
    #[error("{message}")]
    Validation { message: String },
}

impl SnippetError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
