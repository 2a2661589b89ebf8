//! Shared utilities for snipvault.
//!
//! This crate provides common utilities used across the snipvault workspace:
//! - ULID-based identifier generation
//! - Logging setup with tracing
//! - Data and config directory resolution
//! - RAII-based timing for operation measurement

pub mod id;
pub mod log;
pub mod path;
pub mod timing;

pub use id::{IdPrefix, Identifier};
pub use timing::TimingGuard;
