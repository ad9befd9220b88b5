//! Per-output record counts written as a TSV metrics file.

use fgoxide::io::DelimFile;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{Result, SplitError};
use crate::sink::OutputSummary;

/// Placeholder used for the reference and read group of the overflow output.
pub const OVERFLOW_KEY: &str = "*";

/// A metric type that can be serialized to TSV files.
pub trait Metric: Serialize + for<'de> Deserialize<'de> + Clone + Default {
    /// Human-readable name for this metric type, used in error messages.
    fn metric_name() -> &'static str;
}

/// Records written to one output.
///
/// The overflow output is reported with `*` for both keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitMetric {
    /// Read group ID
    pub read_group: String,
    /// Reference sequence name
    pub reference: String,
    /// Path of the output file
    pub path: String,
    /// Records written to the output
    pub records: u64,
}

impl Metric for SplitMetric {
    fn metric_name() -> &'static str {
        "split"
    }
}

impl From<&OutputSummary> for SplitMetric {
    fn from(summary: &OutputSummary) -> Self {
        let (read_group, reference) = match &summary.key {
            Some(key) => (key.read_group.clone(), key.reference.clone()),
            None => (OVERFLOW_KEY.to_string(), OVERFLOW_KEY.to_string()),
        };
        Self { read_group, reference, path: summary.path.display().to_string(), records: summary.records }
    }
}

/// Write metrics to a TSV file with a header row.
///
/// # Errors
/// Returns [`SplitError::Metrics`] if the file cannot be created or written
pub fn write_metrics<T: Metric>(path: &Path, metrics: &[T]) -> Result<()> {
    DelimFile::default().write_tsv(&path, metrics).map_err(|e| SplitError::Metrics {
        path: path.to_path_buf(),
        reason: format!("{} metrics: {e}", T::metric_name()),
    })
}

/// Write one [`SplitMetric`] row per output, in the order given.
///
/// # Errors
/// Returns [`SplitError::Metrics`] if the file cannot be written
pub fn write_split_metrics(path: &Path, outputs: &[OutputSummary]) -> Result<()> {
    let rows: Vec<SplitMetric> = outputs.iter().map(SplitMetric::from).collect();
    write_metrics(path, &rows)
}
