//! Deduplicating sink
//!
//! The single write path of an ingestion cycle: one merged batch in, one
//! storage round-trip out.

use crate::ingest::ItemRecord;
use crate::storage::{with_storage, SharedStorage, StorageResult};

/// Commits cycle batches, keeping only titles the store has not seen
#[derive(Clone)]
pub struct DedupSink {
    storage: SharedStorage,
}

impl DedupSink {
    pub fn new(storage: SharedStorage) -> Self {
        Self { storage }
    }

    /// Commits one batch
    ///
    /// An empty batch performs no storage call. Otherwise exactly one atomic
    /// insert-where-absent operation is issued; a failure is returned as a
    /// single error for the whole batch and is not retried here.
    ///
    /// # Returns
    ///
    /// The number of items actually stored
    pub async fn commit(&self, batch: Vec<ItemRecord>) -> StorageResult<u64> {
        if batch.is_empty() {
            return Ok(0);
        }

        let submitted = batch.len();
        let stored = with_storage(&self.storage, move |s| s.insert_new_items(&batch)).await?;

        tracing::debug!(
            submitted,
            stored,
            skipped = (submitted as u64).saturating_sub(stored),
            "Committed cycle batch"
        );

        Ok(stored)
    }

    /// Returns the underlying storage handle
    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }
}
