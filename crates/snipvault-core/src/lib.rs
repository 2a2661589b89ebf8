//! Core snippet logic for snipvault.
//!
//! This crate contains:
//! - Configuration loading and merging
//! - Snippet records and the repository over [`snipvault_storage::Storage`]
//! - The [`SnippetService`] used by the HTTP API and the CLI

pub mod config;
pub mod error;
pub mod service;
pub mod snippet;

pub use config::Config;
pub use error::{ConfigError, CoreError, CoreResult, SnippetError};
pub use service::SnippetService;
pub use snippet::{Snippet, SnippetRepository};
