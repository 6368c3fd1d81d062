//! Consecutive-failure tracker for an upstream data source.
//!
//! Each service owns one `FailureTracker` and feeds it the outcome of every provider
//! call. The tracker folds those outcomes into a three-state `SourceStatus`:
//!
//! - `record_success()`: resets the failure streak and marks the source available.
//! - `record_failure(err)`: extends the streak; the source becomes degraded, and
//!   unavailable once the streak reaches `max_failures`.
//! - `status()`: read-only view used by health reporting and HTML badges.
//!
//! A single success always brings the source back to available; there is no
//! cool-down. The tracker is not synchronized; wrap it in a `Mutex` when shared.

use chrono::{DateTime, Utc};
use market_common::MarketError;
use market_common::status::SourceStatus;

/// Failure streak length that marks a source unavailable when none is configured.
pub const DEFAULT_MAX_FAILURES: u32 = 5;

/// Tracks consecutive provider failures and derives the source status from them.
pub struct FailureTracker {
    consecutive_failures: u32,
    max_failures: u32,
    total_failures: u64,
    status: SourceStatus,
    last_error: Option<String>,
    last_success: Option<DateTime<Utc>>,
}

impl FailureTracker {
    /// Create a tracker that reports `Unavailable` after `max_failures` failures in a row.
    pub fn new(max_failures: u32) -> Self {
        Self {
            consecutive_failures: 0,
            max_failures: max_failures.max(1),
            total_failures: 0,
            status: SourceStatus::Available,
            last_error: None,
            last_success: None,
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.status = SourceStatus::Available;
        self.last_success = Some(Utc::now());
    }

    pub fn record_failure(&mut self, err: &MarketError) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.total_failures += 1;
        self.last_error = Some(err.to_string());
        self.status = if self.consecutive_failures >= self.max_failures {
            SourceStatus::Unavailable
        } else {
            SourceStatus::Degraded
        };
    }

    pub fn status(&self) -> SourceStatus {
        self.status
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn total_failures(&self) -> u64 {
        self.total_failures
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.last_success
    }
}

impl Default for FailureTracker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FAILURES)
    }
}
