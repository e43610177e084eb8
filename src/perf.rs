//! Latency budgets for engine operations.
//!
//! | Operation            | Target | Warning | Panic |
//! |----------------------|--------|---------|-------|
//! | Similarity lookup    | 1ms    | 10ms    | 100ms |
//! | Cached neighbours    | 5ms    | 50ms    | 500ms |
//! | Neighbour scan       | 2s     | 10s     | 60s   |
//! | Index build          | 10s    | 60s     | 300s  |
//!
//! Exceeding the warning threshold logs a `warn!` event.

use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Performance budget for an operation.
#[derive(Debug, Clone, Copy)]
pub struct Budget {
    pub name: &'static str,
    /// Expected p99 latency.
    pub target: Duration,
    pub warning: Duration,
    pub panic: Duration,
}

impl Budget {
    #[must_use]
    pub const fn new(name: &'static str, target_ms: u64, warning_ms: u64, panic_ms: u64) -> Self {
        Self {
            name,
            target: Duration::from_millis(target_ms),
            warning: Duration::from_millis(warning_ms),
            panic: Duration::from_millis(panic_ms),
        }
    }

    /// Get the status of a duration relative to this budget.
    #[must_use]
    pub fn status(&self, duration: Duration) -> BudgetStatus {
        if duration <= self.target {
            BudgetStatus::OnTarget
        } else if duration <= self.warning {
            BudgetStatus::Acceptable
        } else if duration <= self.panic {
            BudgetStatus::Warning
        } else {
            BudgetStatus::Exceeded
        }
    }
}

/// Status of an operation relative to its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    OnTarget,
    Acceptable,
    Warning,
    Exceeded,
}

impl BudgetStatus {
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::OnTarget | Self::Acceptable)
    }
}

pub const SIMILARITY: Budget = Budget::new("similarity", 1, 10, 100);

pub const NEIGHBORS_CACHED: Budget = Budget::new("neighbors_cached", 5, 50, 500);

/// One vocabulary-wide scan; dominated by one vector read per word.
pub const NEIGHBORS_SCAN: Budget = Budget::new("neighbors_scan", 2_000, 10_000, 60_000);

pub const INDEX_BUILD: Budget = Budget::new("index_build", 10_000, 60_000, 300_000);

/// Tracks an operation's duration and checks it against a budget.
#[derive(Debug)]
pub struct Timer {
    budget: Budget,
    start: Instant,
}

impl Timer {
    #[must_use]
    pub fn start(budget: Budget) -> Self {
        Self {
            budget,
            start: Instant::now(),
        }
    }

    /// Stop the timer, log against the budget and return the duration.
    pub fn stop(self) -> Duration {
        let duration = self.start.elapsed();
        let status = self.budget.status(duration);

        if status.is_ok() {
            debug!(
                operation = self.budget.name,
                duration_ms = duration.as_millis(),
                ?status,
                "Operation within budget"
            );
        } else {
            warn!(
                operation = self.budget.name,
                duration_ms = duration.as_millis(),
                warning_ms = self.budget.warning.as_millis(),
                ?status,
                "Operation exceeded latency budget"
            );
        }

        duration
    }
}
