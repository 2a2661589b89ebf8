//! Command implementations.

pub mod history;
pub mod logging;
