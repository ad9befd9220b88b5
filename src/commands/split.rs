//! Split a BAM into one BAM per (read group, reference) pair.

use anyhow::Result;
use bamsplit_lib::progress::LogProgress;
use bamsplit_lib::split::{SplitConfig, run_split};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use crate::commands::command::Command;
use crate::commands::common::{CompressionOptions, ProgressOptions};
use crate::version::VERSION;

/// Split a BAM by read group and reference.
#[derive(Debug, Parser)]
#[command(
    name = "split",
    about = "\x1b[38;5;166m[UTILITIES]\x1b[0m      \x1b[36mSplit a BAM by read group and reference\x1b[0m",
    long_about = r#"
Split a BAM into one BAM per (read group, reference) pair in a single pass.

References are taken from the first column of a tab-separated index such as a FASTA .fai
(additional columns are ignored). Read groups are taken from the @RG records of the input
header. Every pair gets an output at <output>/<read group>/<reference>.bam, including pairs
that receive no records, which are written as header-only BAMs. Each output carries the input
header plus a @PG record for this program. Records are copied byte for byte and keep their
input order within each output.

A record whose reference is not in the index, that is unplaced, or whose RG tag is missing or
not declared in the header stops the run. With --tolerate-unknown-keys such records are
written to <output>/unmatched.bam instead.

Every output is held open for the whole run. The open file limit is raised as needed, and the
run fails before reading any record if it cannot be raised far enough. Use --max-open-handles
to cap the number of open outputs; outputs are then closed and reopened on demand, least
recently used first.

Existing outputs are truncated, so rerunning into the same directory replaces them.

Example usage:
  bamsplit split -i sample.bam -x ref.fa.fai -o split/
  bamsplit split -i sample.bam -x ref.fa.fai -o split/ --threads 4 --metrics split.txt
  bamsplit split -i sample.bam -x ref.fa.fai -o split/ --max-open-handles 500
"#
)]
pub struct Split {
    /// Input BAM file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Tab-separated index whose first column lists the references (e.g. a FASTA .fai)
    #[arg(short = 'x', long = "index")]
    pub index: PathBuf,

    /// Output directory
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    /// Threads for decompressing the input and closing outputs
    #[arg(short = 't', long = "threads", default_value_t = 1)]
    pub threads: usize,

    /// Most outputs to hold open at once (default: all of them)
    #[arg(long = "max-open-handles")]
    pub max_open_handles: Option<usize>,

    /// Write records without an output of their own to <output>/unmatched.bam
    #[arg(long = "tolerate-unknown-keys", default_value = "false")]
    pub tolerate_unknown_keys: bool,

    /// Do not add a @PG record to the output headers
    #[arg(long = "no-pg", default_value = "false")]
    pub no_pg: bool,

    /// Optional output file for per-output record counts
    #[arg(short = 'm', long = "metrics")]
    pub metrics: Option<PathBuf>,

    /// Progress logging options
    #[command(flatten)]
    pub progress: ProgressOptions,

    /// Compression options for output BAMs.
    #[command(flatten)]
    pub compression: CompressionOptions,
}

impl Split {
    /// Library configuration for this invocation.
    fn config(&self, command_line: &str) -> SplitConfig {
        SplitConfig {
            threads: self.threads,
            compression_level: self.compression.compression_level,
            progress_interval: self.progress.progress_interval,
            close_progress_interval: self.progress.close_progress_interval,
            max_open_handles: self.max_open_handles,
            tolerate_unknown_keys: self.tolerate_unknown_keys,
            add_pg: !self.no_pg,
            metrics: self.metrics.clone(),
            version: VERSION.to_string(),
            command_line: command_line.to_string(),
            ..SplitConfig::new(&self.input, &self.index, &self.output)
        }
    }
}

impl Command for Split {
    fn execute(&self, command_line: &str) -> Result<()> {
        let config = self.config(command_line);
        let summary = run_split(&config, &LogProgress)?;
        info!(
            "Wrote {} records to {} outputs under {}",
            summary.stats.records,
            summary.outputs.len(),
            self.output.display()
        );
        Ok(())
    }
}
