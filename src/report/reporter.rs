//! Error reporter
//!
//! Every per-feed failure and every storage failure of a cycle is routed here.
//! Nothing reported is fatal on its own; the reporter only tracks how many
//! cycles in a row failed to reach storage and turns that into a [`Liveness`]
//! verdict for the scheduler.

use crate::ingest::FetchError;
use crate::storage::StorageError;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Number of finished cycle reports kept in memory
pub const REPORT_HISTORY: usize = 32;

/// A single feed that produced nothing this cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFailure {
    pub feed: String,
    pub error: FetchError,
}

/// Summary of one ingestion cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Cycle sequence number, starting at 1
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub feeds_total: usize,
    pub feed_failures: Vec<FeedFailure>,
    /// Items in the merged batch handed to the sink
    pub extracted: usize,
    /// Items the sink actually stored
    pub stored: u64,
    pub storage_error: Option<String>,
}

impl CycleReport {
    pub fn begin(cycle: u64, feeds_total: usize) -> Self {
        Self {
            cycle,
            started_at: Utc::now(),
            finished_at: None,
            feeds_total,
            feed_failures: Vec::new(),
            extracted: 0,
            stored: 0,
            storage_error: None,
        }
    }

    /// Number of feeds whose items made it into the batch
    pub fn feeds_succeeded(&self) -> usize {
        self.feeds_total.saturating_sub(self.feed_failures.len())
    }

    /// Items in the batch that were already present
    pub fn skipped(&self) -> u64 {
        if self.storage_error.is_some() {
            return 0;
        }
        (self.extracted as u64).saturating_sub(self.stored)
    }
}

/// Verdict on whether the scheduler may keep running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Healthy,
    /// Storage failed for this many cycles in a row, reaching the limit
    Unavailable { consecutive: u32 },
}

/// Collects cycle failures and keeps a short history of cycle reports
#[derive(Debug, Clone)]
pub struct ErrorReporter {
    history: VecDeque<CycleReport>,
    consecutive_storage_failures: u32,
    /// 0 disables the liveness limit
    max_consecutive_failures: u32,
}

impl ErrorReporter {
    pub fn new(max_consecutive_failures: u32) -> Self {
        Self {
            history: VecDeque::with_capacity(REPORT_HISTORY),
            consecutive_storage_failures: 0,
            max_consecutive_failures,
        }
    }

    /// Records a feed that failed to fetch
    pub fn record_feed_failure(&self, report: &mut CycleReport, error: FetchError) {
        tracing::warn!("Cycle {}: feed {} failed: {}", report.cycle, error.url(), error);
        report.feed_failures.push(FeedFailure {
            feed: error.url().to_string(),
            error,
        });
    }

    /// Records a successful batch commit
    pub fn record_commit(&mut self, report: &mut CycleReport, stored: u64) {
        report.stored = stored;
        if self.consecutive_storage_failures > 0 {
            tracing::info!(
                "Storage recovered after {} failed cycle(s)",
                self.consecutive_storage_failures
            );
        }
        self.consecutive_storage_failures = 0;
    }

    /// Records a failed batch commit and returns the resulting liveness
    pub fn record_storage_failure(
        &mut self,
        report: &mut CycleReport,
        error: &StorageError,
    ) -> Liveness {
        self.consecutive_storage_failures += 1;
        report.storage_error = Some(error.to_string());

        tracing::error!(
            "Cycle {}: failed to commit {} item(s): {} ({} consecutive failure(s))",
            report.cycle,
            report.extracted,
            error,
            self.consecutive_storage_failures
        );

        self.liveness()
    }

    /// Stamps the report as finished and adds it to the history
    pub fn finish(&mut self, mut report: CycleReport) -> CycleReport {
        report.finished_at = Some(Utc::now());

        tracing::info!(
            "Cycle {} complete: {}/{} feeds ok, {} extracted, {} new, {} skipped",
            report.cycle,
            report.feeds_succeeded(),
            report.feeds_total,
            report.extracted,
            report.stored,
            report.skipped()
        );

        if self.history.len() == REPORT_HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(report.clone());
        report
    }

    pub fn liveness(&self) -> Liveness {
        if self.max_consecutive_failures > 0
            && self.consecutive_storage_failures >= self.max_consecutive_failures
        {
            Liveness::Unavailable {
                consecutive: self.consecutive_storage_failures,
            }
        } else {
            Liveness::Healthy
        }
    }

    pub fn consecutive_storage_failures(&self) -> u32 {
        self.consecutive_storage_failures
    }

    /// Finished reports, oldest first
    pub fn history(&self) -> impl Iterator<Item = &CycleReport> {
        self.history.iter()
    }

    pub fn last_report(&self) -> Option<&CycleReport> {
        self.history.back()
    }
}
