//! End-to-end split of one BAM into per-(read group, reference) BAMs.
//!
//! [`run_split`] drives the phases in order: key discovery, output creation, the
//! routing pass, and shutdown. Everything that can fail before the first record is read
//! (missing index, no read groups, unusable keys, descriptor limits, directory and file
//! creation) is checked first, so a run either fails without reading the source or
//! reads it exactly once.

use log::info;
use std::path::{Path, PathBuf};

use crate::bam_io::{create_raw_bam_reader, encode_bam_header};
use crate::engine::{DEFAULT_PROGRESS_INTERVAL, DemuxEngine, EngineStats};
use crate::errors::{Result, SplitError};
use crate::header::derive_output_header;
use crate::keys::discover;
use crate::limits::{ensure_descriptor_limit, required_descriptors};
use crate::logging::{OperationTimer, format_count, log_split_summary};
use crate::metrics::write_split_metrics;
use crate::progress::ProgressObserver;
use crate::registry::{OutputLayout, RegistryOptions, RoutingTable};
use crate::shutdown::{CloseOptions, DEFAULT_CLOSE_PROGRESS_INTERVAL, close_all};
use crate::sink::OutputSummary;
use crate::validation::{validate_file_exists, validate_in_range, validate_positive};

/// Everything needed for one split run.
#[derive(Debug, Clone)]
pub struct SplitConfig {
    /// Source BAM
    pub input: PathBuf,
    /// Tab-separated index whose first column lists the references to split by
    pub index: PathBuf,
    /// Root of the output tree
    pub output: PathBuf,
    /// Threads for decompressing the source and for closing outputs
    pub threads: usize,
    /// BGZF compression level of the outputs (1-12)
    pub compression_level: u32,
    /// Records between progress reports
    pub progress_interval: u64,
    /// Closed outputs between progress reports
    pub close_progress_interval: u64,
    /// Most outputs to hold open at once; `None` holds all of them open
    pub max_open_handles: Option<usize>,
    /// Write records without an output of their own to an overflow output
    pub tolerate_unknown_keys: bool,
    /// Add a @PG record to the output headers
    pub add_pg: bool,
    /// Optional per-output metrics file
    pub metrics: Option<PathBuf>,
    /// Version recorded in the @PG record
    pub version: String,
    /// Command line recorded in the @PG record
    pub command_line: String,
}

impl SplitConfig {
    /// A configuration with default tuning for the given paths.
    pub fn new(
        input: impl Into<PathBuf>,
        index: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input: input.into(),
            index: index.into(),
            output: output.into(),
            threads: 1,
            compression_level: 1,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            close_progress_interval: DEFAULT_CLOSE_PROGRESS_INTERVAL,
            max_open_handles: None,
            tolerate_unknown_keys: false,
            add_pg: true,
            metrics: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            command_line: String::new(),
        }
    }

    /// Check the parameters and input paths.
    ///
    /// # Errors
    /// Returns the first invalid parameter or missing input
    pub fn validate(&self) -> Result<()> {
        validate_file_exists(&self.input, "Input BAM")?;
        validate_positive(self.threads, "threads")?;
        validate_in_range(self.compression_level, 1, 12, "compression-level")?;
        validate_positive(self.progress_interval, "progress-interval")?;
        validate_positive(self.close_progress_interval, "close-progress-interval")?;
        if let Some(max) = self.max_open_handles {
            validate_positive(max, "max-open-handles")?;
        }
        Ok(())
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct SplitSummary {
    /// Counts from the routing pass
    pub stats: EngineStats,
    /// Every finished output, pairs first and the overflow output last
    pub outputs: Vec<OutputSummary>,
}

impl SplitSummary {
    /// Outputs that received no records.
    #[must_use]
    pub fn empty_outputs(&self) -> usize {
        self.outputs.iter().filter(|o| o.records == 0).count()
    }
}

/// Split `config.input` into `<output>/<read group>/<reference>.bam`.
///
/// # Errors
/// Any [`SplitError`]. Errors other than [`SplitError::CloseFailures`] and
/// [`SplitError::Metrics`] leave outputs unfinished.
pub fn run_split(config: &SplitConfig, observer: &dyn ProgressObserver) -> Result<SplitSummary> {
    let timer = OperationTimer::new("Splitting BAM");
    config.validate()?;

    info!("Input: {}", config.input.display());
    info!("Reference index: {}", config.index.display());
    info!("Output: {}", config.output.display());

    let (mut reader, header) = create_raw_bam_reader(&config.input, config.threads)?;

    let key_sets = discover(&config.index, &config.input, &header)?;
    key_sets.validate()?;
    info!(
        "Splitting by {} references x {} read groups",
        format_count(key_sets.references.len() as u64),
        format_count(key_sets.read_groups.len() as u64)
    );

    let output_header =
        derive_output_header(&header, config.add_pg, &config.version, &config.command_line)
            .map_err(|e| header_error(&config.input, &e.to_string()))?;
    let header_bytes = encode_bam_header(&output_header)
        .map_err(|e| header_error(&config.input, &e.to_string()))?;

    let options = RegistryOptions {
        compression_level: config.compression_level,
        max_open_handles: config.max_open_handles,
        overflow: config.tolerate_unknown_keys,
    };
    let outputs = key_sets.len() + usize::from(options.overflow);
    let open_outputs = options.open_outputs(outputs, config.threads);
    ensure_descriptor_limit(required_descriptors(open_outputs))?;

    let engine = DemuxEngine::new(&header, &key_sets, &config.input, config.progress_interval);
    let layout = OutputLayout::new(&config.output);
    let mut table = RoutingTable::build(&layout, key_sets, &header_bytes, &options)?;

    let stats = engine.run(&mut reader, &mut table, observer)?;

    let close_options =
        CloseOptions { threads: config.threads, progress_interval: config.close_progress_interval };
    let outputs = close_all(table, close_options, observer).into_result()?;

    if let Some(path) = &config.metrics {
        write_split_metrics(path, &outputs)?;
    }

    let summary = SplitSummary { stats, outputs };
    log_split_summary(&summary.stats, summary.outputs.len(), summary.empty_outputs());
    timer.log_completion(summary.stats.records);
    Ok(summary)
}

fn header_error(input: &Path, reason: &str) -> SplitError {
    SplitError::InvalidFileFormat {
        file_type: "BAM header".to_string(),
        path: input.display().to_string(),
        reason: reason.to_string(),
    }
}
