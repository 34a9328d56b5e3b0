//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::ingest::ItemRecord;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageResult};
use crate::storage::StoredNewsItem;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Readers (the API) must not block the single batch writer
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn news_from_row(row: &Row<'_>) -> rusqlite::Result<StoredNewsItem> {
    Ok(StoredNewsItem {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        publication_date: row.get(3)?,
        source_link: row.get(4)?,
        inserted_at: row.get(5)?,
    })
}

impl Storage for SqliteStorage {
    fn insert_new_items(&mut self, items: &[ItemRecord]) -> StorageResult<u64> {
        if items.is_empty() {
            return Ok(0);
        }

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut inserted = 0u64;
        {
            // The UNIQUE(name) constraint decides what is new; conflicting rows,
            // including repeats earlier in this same batch, are dropped.
            let mut stmt = tx.prepare_cached(
                "INSERT INTO news (name, description, publication_date, link, inserted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(name) DO NOTHING",
            )?;

            for item in items {
                inserted += stmt.execute(params![
                    item.title,
                    item.description,
                    item.publication_date,
                    item.source_link,
                    now
                ])? as u64;
            }
        }
        tx.commit()?;

        Ok(inserted)
    }

    fn latest_items(&self, limit: usize) -> StorageResult<Vec<StoredNewsItem>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, publication_date, link, inserted_at
             FROM news ORDER BY id DESC LIMIT ?1",
        )?;

        let items = stmt
            .query_map(params![limit], news_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    fn count_items(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM news", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn latest_inserted_at(&self) -> StorageResult<Option<String>> {
        let ts = self
            .conn
            .query_row(
                "SELECT inserted_at FROM news ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(ts)
    }
}
