//! Fan-out and fan-in for one ingestion cycle
//!
//! Each feed gets its own task that fetches the body and extracts items.
//! Results are joined in configuration order, never completion order, so the
//! merged batch is deterministic for a given set of responses.

use crate::ingest::{extract_items, FetchError, Fetcher, ItemRecord};
use crate::report::{CycleReport, ErrorReporter};
use std::time::Duration;

/// What a single feed produced this cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedOutcome {
    pub feed: String,
    pub result: Result<Vec<ItemRecord>, FetchError>,
}

/// Fetches and extracts every feed concurrently
///
/// One task is spawned per feed, and all of them start before any is awaited.
/// The returned outcomes are in the same order as `feeds`. A task that
/// panics is reported as [`FetchError::Aborted`] for its feed.
///
/// # Arguments
///
/// * `feeds` - Feed URLs in configuration order
/// * `fetcher` - Shared HTTP fetcher
/// * `deadline` - Per-feed fetch deadline
pub async fn fetch_all(
    feeds: &[String],
    fetcher: &Fetcher,
    deadline: Duration,
) -> Vec<FeedOutcome> {
    let handles: Vec<_> = feeds
        .iter()
        .map(|feed| {
            let fetcher = fetcher.clone();
            let url = feed.clone();
            let handle = tokio::spawn(async move {
                let body = fetcher.fetch(&url, deadline).await?;
                let items = extract_items(&body, &url);
                tracing::debug!("Extracted {} item(s) from {}", items.len(), url);
                Ok::<_, FetchError>(items)
            });
            (feed.clone(), handle)
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (feed, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(FetchError::Aborted {
                url: feed.clone(),
                message: e.to_string(),
            }),
        };
        outcomes.push(FeedOutcome { feed, result });
    }
    outcomes
}

/// Concatenates successful outcomes into one batch
///
/// Failed feeds contribute nothing and are handed to the reporter.
/// `report.extracted` is set to the batch size.
pub fn merge_outcomes(
    outcomes: Vec<FeedOutcome>,
    reporter: &ErrorReporter,
    report: &mut CycleReport,
) -> Vec<ItemRecord> {
    let mut batch = Vec::new();
    for outcome in outcomes {
        match outcome.result {
            Ok(items) => batch.extend(items),
            Err(error) => reporter.record_feed_failure(report, error),
        }
    }
    report.extracted = batch.len();
    batch
}
