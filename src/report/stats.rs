//! Statistics from the news store
//!
//! Backs the `--stats` command: a quick look at what ingestion has stored so far.

use crate::storage::{Storage, StorageResult, StoredNewsItem};

/// Number of newest items shown by `--stats`
const NEWEST_SHOWN: usize = 5;

/// News store summary
#[derive(Debug, Clone)]
pub struct NewsStatistics {
    /// Total number of stored items
    pub total_items: u64,

    /// Insertion timestamp of the most recent item
    pub latest_inserted_at: Option<String>,

    /// Most recently inserted items, newest first
    pub newest: Vec<StoredNewsItem>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(NewsStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<NewsStatistics> {
    Ok(NewsStatistics {
        total_items: storage.count_items()?,
        latest_inserted_at: storage.latest_inserted_at()?,
        newest: storage.latest_items(NEWEST_SHOWN)?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &NewsStatistics) {
    println!("=== News Statistics ===\n");

    println!("Overview:");
    println!("  Total items stored: {}", stats.total_items);
    match &stats.latest_inserted_at {
        Some(at) => println!("  Last insert: {}", at),
        None => println!("  Last insert: never"),
    }
    println!();

    if !stats.newest.is_empty() {
        println!("Newest Items:");
        for item in &stats.newest {
            println!("  [{}] {}", item.id, item.title);
            println!("      {} ({})", item.source_link, item.publication_date);
        }
        println!();
    }
}
