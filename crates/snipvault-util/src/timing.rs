//! RAII-based timing utilities for measuring and logging operation durations.
//!
//! # Example
//!
//! ```rust,ignore
//! use snipvault_util::timing::TimingGuard;
//!
//! async fn commit(entity_id: &str) {
//!     let _timing = TimingGuard::history("commit").with_entity(entity_id);
//!     // ... write blob, append commit ...
//!     // Duration is logged when _timing is dropped
//! }
//! ```

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Durations at or above this are logged at info level.
const INFO_THRESHOLD_MS: u64 = 100;

/// Durations at or above this are logged at warn level.
const WARN_THRESHOLD_MS: u64 = 2000;

/// RAII guard that measures and logs the duration of an operation.
///
/// Fast operations are logged at debug level, slow ones at info or warn.
pub struct TimingGuard {
    /// Type of operation (e.g., "history", "request")
    operation_type: &'static str,
    /// Name of the specific operation (e.g., "commit", "diff")
    operation_name: String,
    /// Entity the operation works on, if any
    entity: Option<String>,
    start: Instant,
}

impl TimingGuard {
    /// Create a new timing guard.
    pub fn new(operation_type: &'static str, operation_name: impl Into<String>) -> Self {
        Self {
            operation_type,
            operation_name: operation_name.into(),
            entity: None,
            start: Instant::now(),
        }
    }

    /// Create a timing guard for a history operation.
    pub fn history(name: impl Into<String>) -> Self {
        Self::new("history", name)
    }

    /// Attach the entity id the operation works on.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Get the elapsed time so far.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let duration_ms = self.start.elapsed().as_millis() as u64;
        let entity = self.entity.as_deref().unwrap_or("-");

        if duration_ms >= WARN_THRESHOLD_MS {
            warn!(
                operation_type = self.operation_type,
                operation_name = %self.operation_name,
                entity,
                duration_ms,
                "Slow operation completed"
            );
        } else if duration_ms >= INFO_THRESHOLD_MS {
            info!(
                operation_type = self.operation_type,
                operation_name = %self.operation_name,
                entity,
                duration_ms,
                "Operation completed"
            );
        } else {
            debug!(
                operation_type = self.operation_type,
                operation_name = %self.operation_name,
                entity,
                duration_ms,
                "Operation completed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_timing_guard_measures_elapsed() {
        let guard = TimingGuard::history("commit").with_entity("snp_1");
        sleep(Duration::from_millis(10));
        assert!(guard.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn test_timing_guard_logs_on_drop() {
        let guard = TimingGuard::new("test", "slow");
        sleep(Duration::from_millis(INFO_THRESHOLD_MS + 5));
        assert!(guard.elapsed().as_millis() as u64 >= INFO_THRESHOLD_MS);
        drop(guard);
    }
}
