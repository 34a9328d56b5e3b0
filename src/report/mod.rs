//! Cycle reporting and statistics
//!
//! This module provides:
//! - The error reporter that records per-feed and storage failures per cycle
//! - Liveness tracking over consecutive storage failures
//! - Statistics loaded from the news store for the `--stats` command

mod reporter;
mod stats;

pub use reporter::{CycleReport, ErrorReporter, FeedFailure, Liveness, REPORT_HISTORY};
pub use stats::{load_statistics, print_statistics, NewsStatistics};
