//! Ingestion module for periodic feed polling
//!
//! This module contains the core ingestion pipeline, including:
//! - HTTP fetching of feed bodies with a per-fetch deadline
//! - Item extraction from raw feed markup
//! - One concurrent fetch+extract task per feed, joined in configuration order
//! - The timer-driven scheduler that commits one batch per cycle

mod cycle;
mod extractor;
mod fetcher;
mod scheduler;

pub use cycle::{fetch_all, merge_outcomes, FeedOutcome};
pub use extractor::extract_items;
pub use fetcher::{build_http_client, FetchError, Fetcher};
pub use scheduler::{Scheduler, SchedulerState};

/// One news item extracted from a feed
///
/// `==` compares all four fields. Whether an item is new is decided by the
/// store's unique title constraint, not by this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    pub title: String,
    pub description: String,
    /// Feed-provided date text, stored as-is
    pub publication_date: String,
    /// URL of the feed the item was read from
    pub source_link: String,
}

impl ItemRecord {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        publication_date: impl Into<String>,
        source_link: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            publication_date: publication_date.into(),
            source_link: source_link.into(),
        }
    }
}
