//! Timer-driven ingestion scheduler
//!
//! This module handles:
//! - Firing one cycle per interval, with the first cycle one interval after start
//! - Running each cycle to completion before cancellation is observed
//! - Committing the merged batch through the dedup sink once per cycle
//! - Stopping with an error when storage stays unreachable

use crate::config::{Config, MAX_REQUEST_PERIOD_SECS};
use crate::ingest::{fetch_all, merge_outcomes, Fetcher};
use crate::report::{CycleReport, ErrorReporter, Liveness};
use crate::storage::{DedupSink, SharedStorage};
use crate::{NewsError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Where the scheduler is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for the next tick or for cancellation
    Idle,
    /// A cycle is in progress
    Running,
    /// Stopped; no further cycles will run
    Terminated,
}

/// Periodic ingestion driver
pub struct Scheduler {
    feeds: Arc<[String]>,
    fetcher: Fetcher,
    sink: DedupSink,
    reporter: ErrorReporter,
    interval: Duration,
    fetch_timeout: Duration,
    cycles_run: u64,
    state: SchedulerState,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `feeds` - Feed URLs in configuration order
    /// * `fetcher` - HTTP fetcher shared by all feed tasks
    /// * `sink` - Where each cycle's batch is committed
    /// * `reporter` - Receives feed and storage failures
    /// * `interval` - Time between cycle starts, capped at one year
    /// * `fetch_timeout` - Per-feed fetch deadline
    pub fn new(
        feeds: Vec<String>,
        fetcher: Fetcher,
        sink: DedupSink,
        reporter: ErrorReporter,
        interval: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            feeds: feeds.into(),
            fetcher,
            sink,
            reporter,
            interval: interval.min(Duration::from_secs(MAX_REQUEST_PERIOD_SECS)),
            fetch_timeout,
            cycles_run: 0,
            state: SchedulerState::Idle,
        }
    }

    /// Builds a scheduler from validated configuration
    pub fn from_config(config: &Config, storage: SharedStorage) -> Result<Self> {
        let fetcher = Fetcher::new(&config.fetcher)?;

        Ok(Self::new(
            config.feeds.urls.clone(),
            fetcher,
            DedupSink::new(storage),
            ErrorReporter::new(config.storage.max_consecutive_failures),
            config.feeds.interval(),
            config.fetcher.timeout(),
        ))
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    /// Runs cycles on every tick until cancelled
    ///
    /// The first cycle fires one interval after the call. A cancellation
    /// that arrives mid-cycle is honored once that cycle has committed.
    /// A dropped cancel sender is treated as cancellation.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Cancelled cleanly
    /// * `Err(NewsError::StorageUnavailable)` - Storage failed too many cycles in a row
    pub async fn run(&mut self, mut cancel: watch::Receiver<bool>) -> Result<()> {
        let now = Instant::now();
        let first_tick = now.checked_add(self.interval).unwrap_or(now);
        let mut ticker = interval_at(first_tick, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            "Polling {} feed(s) every {:?}",
            self.feeds.len(),
            self.interval
        );

        loop {
            self.state = SchedulerState::Idle;

            tokio::select! {
                biased;
                _ = cancel.wait_for(|&cancelled| cancelled) => {
                    tracing::info!("Cancellation received, stopping scheduler");
                    break;
                }
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.run_cycle().await {
                self.state = SchedulerState::Terminated;
                return Err(e);
            }
        }

        self.state = SchedulerState::Terminated;
        Ok(())
    }

    /// Runs exactly one cycle now
    ///
    /// Fetches every feed concurrently, merges the results in configuration
    /// order, and commits the batch with a single sink call.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.state = SchedulerState::Running;
        self.cycles_run += 1;
        let mut report = CycleReport::begin(self.cycles_run, self.feeds.len());

        tracing::debug!("Starting cycle {}", report.cycle);

        let outcomes = fetch_all(&self.feeds, &self.fetcher, self.fetch_timeout).await;
        let batch = merge_outcomes(outcomes, &self.reporter, &mut report);

        let liveness = if batch.is_empty() {
            self.reporter.liveness()
        } else {
            match self.sink.commit(batch).await {
                Ok(stored) => {
                    self.reporter.record_commit(&mut report, stored);
                    Liveness::Healthy
                }
                Err(e) => self.reporter.record_storage_failure(&mut report, &e),
            }
        };

        let report = self.reporter.finish(report);
        self.state = SchedulerState::Idle;

        match liveness {
            Liveness::Healthy => Ok(report),
            Liveness::Unavailable { consecutive } => {
                self.state = SchedulerState::Terminated;
                tracing::error!(
                    "Storage unreachable for {} consecutive cycles, giving up",
                    consecutive
                );
                Err(NewsError::StorageUnavailable { consecutive })
            }
        }
    }
}
