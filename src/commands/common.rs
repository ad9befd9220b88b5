//! Common CLI options shared across commands.
//!
//! These argument structures are composed into command structs using `#[command(flatten)]`.

use clap::Args;

/// Options for output compression.
///
/// Controls BGZF compression level for BAM output files.
#[derive(Debug, Clone, Default, Args)]
pub struct CompressionOptions {
    /// Compression level for output BAMs (1-12).
    ///
    /// Level 1 is fastest with larger files.
    /// Level 12 produces smallest files but is slowest.
    #[arg(long, default_value_t = 1)]
    pub compression_level: u32,
}

/// Options for progress logging.
#[derive(Debug, Clone, Args)]
pub struct ProgressOptions {
    /// Log progress every this many records read.
    #[arg(long = "progress-interval", default_value_t = 1_000_000)]
    pub progress_interval: u64,

    /// Log progress every this many outputs closed.
    #[arg(long = "close-progress-interval", default_value_t = 100)]
    pub close_progress_interval: u64,
}

impl Default for ProgressOptions {
    fn default() -> Self {
        Self { progress_interval: 1_000_000, close_progress_interval: 100 }
    }
}
