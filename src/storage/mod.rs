//! Storage module for persisting news items
//!
//! This module handles all database operations for the ingester, including:
//! - SQLite database initialization and schema management
//! - The batch insert-where-absent commit used once per cycle
//! - Most-recent-first reads for the API and statistics

mod schema;
mod sink;
mod sqlite;
mod traits;

pub use sink::DedupSink;
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::config::StorageConfig;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Storage handle shared between the sink, the read API and the CLI
pub type SharedStorage = Arc<Mutex<dyn Storage + Send>>;

/// Represents a news item as persisted in the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNewsItem {
    /// Insertion identity, increasing with every committed item
    pub id: i64,
    pub title: String,
    pub description: String,
    pub publication_date: String,
    pub source_link: String,
    pub inserted_at: String,
}

/// Wraps a concrete backend into a [`SharedStorage`] handle
pub fn share<S: Storage + Send + 'static>(storage: S) -> SharedStorage {
    Arc::new(Mutex::new(storage))
}

/// Opens the SQLite database, retrying on failure
///
/// Attempts `connect_retries` opens, sleeping `retry_delay_ms` between them.
/// Each failed attempt is logged; the last error is returned when every attempt fails.
pub async fn open_storage_with_retry(config: &StorageConfig) -> StorageResult<SqliteStorage> {
    let path = Path::new(&config.database_path);
    let attempts = config.connect_retries.max(1);
    let mut attempt = 1;

    loop {
        match SqliteStorage::new(path) {
            Ok(storage) => {
                if attempt > 1 {
                    tracing::info!("Opened database {} on attempt {}", path.display(), attempt);
                }
                return Ok(storage);
            }
            Err(e) if attempt < attempts => {
                tracing::warn!(
                    "Attempt {}/{}: failed to open database {}: {}, retrying in {:?}",
                    attempt,
                    attempts,
                    path.display(),
                    e,
                    config.retry_delay()
                );
                tokio::time::sleep(config.retry_delay()).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(StorageError::Open {
                    attempts,
                    message: e.to_string(),
                })
            }
        }
    }
}

/// Runs a storage operation on the blocking thread pool
///
/// The lock is taken inside the blocking task and released before the
/// returned future resolves, so no lock is ever held across an `.await`.
pub async fn with_storage<T, F>(storage: &SharedStorage, op: F) -> StorageResult<T>
where
    T: Send + 'static,
    F: FnOnce(&mut (dyn Storage + Send + 'static)) -> StorageResult<T> + Send + 'static,
{
    let storage = Arc::clone(storage);
    tokio::task::spawn_blocking(move || {
        let mut guard = storage.lock().map_err(|_| StorageError::Poisoned)?;
        op(&mut *guard)
    })
    .await
    .map_err(|e| StorageError::Task(e.to_string()))?
}
