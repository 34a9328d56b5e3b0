//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Newsreel database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Ingested news items; the title (name) is the natural key
CREATE TABLE IF NOT EXISTS news (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL,
    publication_date TEXT NOT NULL,
    link TEXT NOT NULL,
    inserted_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
