//! Progress reporting for the read loop and the close phase.
//!
//! The engine and the shutdown coordinator never log progress directly. They count with a
//! [`ProgressTracker`] and hand each interval milestone to a [`ProgressObserver`]. The
//! default observer, [`LogProgress`], writes the milestones through the `log` facade.

use log::info;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::logging::{format_count, format_duration};

/// Receives progress milestones.
///
/// Implementations must be `Sync` because handles may be closed from several threads.
pub trait ProgressObserver: Sync {
    /// Called each time the number of records read reaches a multiple of the interval.
    fn records_processed(&self, count: u64, elapsed: Duration);

    /// Called each time the number of finished outputs reaches a multiple of the interval.
    fn handles_closed(&self, closed: u64, total: u64);
}

/// Observer that logs milestones at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn records_processed(&self, count: u64, elapsed: Duration) {
        info!("Processed {} records ({})", format_count(count), format_duration(elapsed));
    }

    fn handles_closed(&self, closed: u64, total: u64) {
        info!("Closed {} of {} output handles", format_count(closed), format_count(total));
    }
}

/// Thread-safe counter that reports each interval boundary it crosses.
///
/// # Example
/// ```
/// use bamsplit_lib::progress::ProgressTracker;
///
/// let tracker = ProgressTracker::new(100);
/// let mut milestones = Vec::new();
/// for _ in 0..250 {
///     tracker.advance(1, |m| milestones.push(m));
/// }
/// assert_eq!(milestones, vec![100, 200]);
/// assert_eq!(tracker.count(), 250);
/// ```
#[derive(Debug)]
pub struct ProgressTracker {
    /// Milestones fall on multiples of this value.
    interval: u64,
    count: AtomicU64,
}

impl ProgressTracker {
    /// Create a tracker with the given interval. An interval of zero is treated as one.
    #[must_use]
    pub fn new(interval: u64) -> Self {
        Self { interval: interval.max(1), count: AtomicU64::new(0) }
    }

    /// Add to the count and call `on_milestone` for every interval boundary crossed.
    ///
    /// A single atomic add is used, so concurrent callers never report the same
    /// milestone twice.
    pub fn advance(&self, additional: u64, mut on_milestone: impl FnMut(u64)) {
        if additional == 0 {
            return;
        }

        let prev = self.count.fetch_add(additional, Ordering::Relaxed);
        let new_count = prev + additional;

        for i in (prev / self.interval + 1)..=(new_count / self.interval) {
            on_milestone(i * self.interval);
        }
    }

    /// Get the current count.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}
