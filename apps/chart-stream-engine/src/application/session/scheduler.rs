//! Batch Scheduler
//!
//! Bounds the number of render operations regardless of ingestion
//! burstiness: any number of snapshots appended within one interval
//! coalesce into at most one flush on the next tick.
//!
//! The scheduler is only the tick decision; the timer itself is a
//! `tokio::time::interval` owned by the session loop. Tests drive the
//! logic deterministically without a clock.

use std::time::Duration;

/// Coalescing flush decision state.
#[derive(Debug)]
pub struct BatchScheduler {
    interval: Duration,
    pending: usize,
    flushes: u64,
}

impl BatchScheduler {
    /// Create a scheduler with a fixed flush interval.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: 0,
            flushes: 0,
        }
    }

    /// The flush interval the session's timer should run at.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Record points appended since the last flush.
    pub const fn record_appended(&mut self, points: usize) {
        self.pending += points;
    }

    /// Points appended since the last flush.
    #[must_use]
    pub const fn pending(&self) -> usize {
        self.pending
    }

    /// Decide whether a timer tick should flush.
    ///
    /// Returns `true` if at least one point was appended since the last
    /// flush, and resets the pending count.
    pub const fn on_tick(&mut self) -> bool {
        if self.pending == 0 {
            return false;
        }
        self.pending = 0;
        self.flushes += 1;
        true
    }

    /// Record an unconditional flush (initial render and session close).
    pub const fn force_flush(&mut self) {
        self.pending = 0;
        self.flushes += 1;
    }

    /// Number of flushes performed.
    #[must_use]
    pub const fn flush_count(&self) -> u64 {
        self.flushes
    }
}

// =============================================================================
// Tests
// =============================================================================
