//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::ingest::ItemRecord;
use crate::storage::StoredNewsItem;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to open database after {attempts} attempts: {message}")]
    Open { attempts: u32, message: String },

    #[error("Storage lock poisoned")]
    Poisoned,

    #[error("Storage task failed: {0}")]
    Task(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The store owns the uniqueness of item titles: the application never checks
/// for existence before writing.
pub trait Storage {
    /// Commits every item whose title is not already stored
    ///
    /// The whole batch is one atomic operation. Titles already present, and
    /// repeated titles within the batch after their first occurrence, are
    /// skipped silently.
    ///
    /// # Returns
    ///
    /// The number of items actually inserted
    fn insert_new_items(&mut self, items: &[ItemRecord]) -> StorageResult<u64>;

    /// Returns up to `limit` items, most recently inserted first
    fn latest_items(&self, limit: usize) -> StorageResult<Vec<StoredNewsItem>>;

    /// Counts stored items
    fn count_items(&self) -> StorageResult<u64>;

    /// Insertion timestamp of the newest item, if any
    fn latest_inserted_at(&self) -> StorageResult<Option<String>>;
}
