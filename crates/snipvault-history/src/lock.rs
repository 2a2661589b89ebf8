//! Per-entity write locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A set of async mutexes keyed by entity id.
///
/// Writers to the same entity queue on one mutex; writers to different
/// entities never contend. Entries are kept for the life of the process.
#[derive(Default)]
pub struct EntityLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `entity_id`.
    pub async fn lock(&self, entity_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            // The map only holds Arcs; a poisoned guard is still consistent.
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks
                .entry(entity_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of entities that have been locked at least once.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_entity_serializes() {
        let locks = Arc::new(EntityLocks::new());
        let guard = locks.lock("snp_a").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("snp_a").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_entities_do_not_block() {
        let locks = EntityLocks::new();
        let _a = locks.lock("snp_a").await;
        let _b = tokio::time::timeout(Duration::from_millis(100), locks.lock("snp_b"))
            .await
            .expect("lock on another entity must not wait");
        assert_eq!(locks.len(), 2);
    }
}
