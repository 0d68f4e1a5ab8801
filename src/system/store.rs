use std::sync::RwLock;

use super::snapshot::ResourceSnapshot;

/// Holder of the most recently published [`ResourceSnapshot`].
///
/// Single writer (the collection loop), many readers (the reporting
/// layer). Both sides work on deep copies: `publish` clones the incoming
/// value under the write lock and `read_current` clones the stored value
/// under the read lock, so the collector's working buffer and a reader's
/// snapshot never alias the stored one.
///
/// Created zero-valued at bootstrap and shared by `Arc`; there is no
/// process-global instance.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<ResourceSnapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current snapshot wholesale. The previous snapshot is
    /// discarded; no history is retained.
    pub fn publish(&self, snapshot: &ResourceSnapshot) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = snapshot.clone();
    }

    /// Returns a copy of the current snapshot. Concurrent readers do not
    /// block each other and never observe a partially written snapshot.
    pub fn read_current(&self) -> ResourceSnapshot {
        let current = self.current.read().unwrap_or_else(|e| e.into_inner());
        current.clone()
    }
}
