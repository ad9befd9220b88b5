//! Finishing every output once the source is exhausted.
//!
//! Closes are independent of each other, so they may run on a rayon pool. A failure never
//! stops the remaining closes: every output is attempted and all failures are reported
//! together.

use log::{debug, warn};
use rayon::prelude::*;
use std::path::PathBuf;

use crate::errors::{Result, SplitError};
use crate::progress::{ProgressObserver, ProgressTracker};
use crate::registry::RoutingTable;
use crate::sink::{OutputHandle, OutputSummary};

/// Default number of closed outputs between progress reports.
pub const DEFAULT_CLOSE_PROGRESS_INTERVAL: u64 = 100;

/// How outputs are closed.
#[derive(Debug, Clone, Copy)]
pub struct CloseOptions {
    /// Threads used to close outputs; 1 closes on the calling thread
    pub threads: usize,
    /// Closed outputs between progress reports
    pub progress_interval: u64,
}

impl Default for CloseOptions {
    fn default() -> Self {
        Self { threads: 1, progress_interval: DEFAULT_CLOSE_PROGRESS_INTERVAL }
    }
}

/// An output that could not be finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFailure {
    /// Path of the output
    pub path: PathBuf,
    /// Description of the failure
    pub error: String,
}

/// Outcome of closing every output.
#[derive(Debug, Default)]
pub struct CloseReport {
    /// Outputs finished successfully, in routing table order
    pub outputs: Vec<OutputSummary>,
    /// Outputs that failed to finish, in routing table order
    pub failures: Vec<CloseFailure>,
}

impl CloseReport {
    /// Whether every output was finished.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// The finished outputs, or an error describing every failure.
    ///
    /// # Errors
    /// Returns [`SplitError::CloseFailures`] if any output failed to finish
    pub fn into_result(self) -> Result<Vec<OutputSummary>> {
        if self.failures.is_empty() {
            return Ok(self.outputs);
        }
        let details = self
            .failures
            .iter()
            .map(|f| format!("  {}: {}", f.path.display(), f.error))
            .collect::<Vec<_>>()
            .join("\n");
        Err(SplitError::CloseFailures { count: self.failures.len(), details })
    }
}

/// Finish every output in `table`.
#[must_use]
pub fn close_all(
    table: RoutingTable,
    options: CloseOptions,
    observer: &dyn ProgressObserver,
) -> CloseReport {
    let handles = table.into_handles();
    let total = handles.len() as u64;
    let tracker = ProgressTracker::new(options.progress_interval);

    let close_one = |handle: OutputHandle| {
        let result = handle.finish();
        tracker.advance(1, |closed| observer.handles_closed(closed, total));
        result
    };

    let results: Vec<_> = if options.threads > 1 {
        match rayon::ThreadPoolBuilder::new().num_threads(options.threads).build() {
            Ok(pool) => pool.install(|| handles.into_par_iter().map(close_one).collect()),
            Err(e) => {
                warn!("Could not start {} close threads, closing serially: {e}", options.threads);
                handles.into_iter().map(close_one).collect()
            }
        }
    } else {
        handles.into_iter().map(close_one).collect()
    };

    let mut report = CloseReport::default();
    for result in results {
        match result {
            Ok(summary) => report.outputs.push(summary),
            Err((path, e)) => {
                warn!("Failed to close {}: {e}", path.display());
                report.failures.push(CloseFailure { path, error: e.to_string() });
            }
        }
    }
    debug!("Closed {} outputs with {} failures", report.outputs.len(), report.failures.len());
    report
}
