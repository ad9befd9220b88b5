//! A single BAM output and the handle that owns it.
//!
//! A [`BamSink`] is either open (file descriptor plus compressor) or suspended (nothing
//! held but the path). Suspending flushes every buffered byte as complete BGZF blocks
//! without the EOF marker, so a suspended file can be reopened in append mode and
//! continued. The EOF marker is written only by [`BamSink::finish`], which consumes the
//! sink and therefore happens exactly once.

use log::debug;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::bgzf_writer::{BGZF_EOF, InlineBgzfCompressor};
use crate::errors::{Result, SplitError};
use crate::keys::CompositeKey;

enum SinkState {
    Open { file: File, compressor: InlineBgzfCompressor },
    Suspended,
}

/// One destination BGZF/BAM stream.
pub struct BamSink {
    path: PathBuf,
    compression_level: u32,
    state: SinkState,
}

impl std::fmt::Debug for BamSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BamSink")
            .field("path", &self.path)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl BamSink {
    /// Create (or truncate) the file at `path` and queue the encoded BAM header.
    ///
    /// `header_bytes` is the uncompressed header block from
    /// [`crate::bam_io::encode_bam_header`].
    pub fn create(path: &Path, header_bytes: &[u8], compression_level: u32) -> io::Result<Self> {
        let file = File::create(path)?;
        let mut compressor = InlineBgzfCompressor::new(compression_level)?;
        compressor.write_all(header_bytes)?;
        Ok(Self {
            path: path.to_path_buf(),
            compression_level,
            state: SinkState::Open { file, compressor },
        })
    }

    /// Path of the output file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the sink currently holds a file descriptor.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.state, SinkState::Open { .. })
    }

    /// Append one record as `block_size` followed by the record bytes.
    ///
    /// # Errors
    /// Fails if the sink is suspended, the record is too large for a BAM record, or the
    /// write fails.
    pub fn write_record(&mut self, record: &[u8]) -> io::Result<()> {
        let SinkState::Open { file, compressor } = &mut self.state else {
            return Err(io::Error::other("output is suspended"));
        };
        let block_size = u32::try_from(record.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "record too large"))?;
        compressor.write_all(&block_size.to_le_bytes())?;
        compressor.write_all(record)?;
        compressor.write_blocks_to(file)
    }

    /// Flush everything written so far as complete blocks and release the descriptor.
    ///
    /// Suspending an already suspended sink does nothing.
    pub fn suspend(&mut self) -> io::Result<()> {
        if let SinkState::Open { file, compressor } = &mut self.state {
            compressor.flush()?;
            compressor.write_blocks_to(file)?;
            file.flush()?;
            self.state = SinkState::Suspended;
            debug!("Suspended {}", self.path.display());
        }
        Ok(())
    }

    /// Reopen a suspended sink in append mode. Resuming an open sink does nothing.
    pub fn resume(&mut self) -> io::Result<()> {
        if let SinkState::Suspended = self.state {
            let file = OpenOptions::new().append(true).open(&self.path)?;
            let compressor = InlineBgzfCompressor::new(self.compression_level)?;
            self.state = SinkState::Open { file, compressor };
        }
        Ok(())
    }

    /// Flush remaining data, append the BGZF EOF marker, and close the file.
    pub fn finish(mut self) -> io::Result<()> {
        self.resume()?;
        if let SinkState::Open { mut file, mut compressor } = self.state {
            compressor.flush()?;
            compressor.write_blocks_to(&mut file)?;
            file.write_all(&BGZF_EOF)?;
            file.flush()?;
        }
        Ok(())
    }
}

/// Result of finishing one output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSummary {
    /// The output's key, or `None` for the overflow output
    pub key: Option<CompositeKey>,
    /// Path of the finished file
    pub path: PathBuf,
    /// Records written
    pub records: u64,
}

/// An output registered in the routing table.
#[derive(Debug)]
pub struct OutputHandle {
    key: Option<CompositeKey>,
    sink: BamSink,
    records: u64,
}

impl OutputHandle {
    /// Wrap a sink for `key`; `None` marks the overflow output.
    #[must_use]
    pub fn new(key: Option<CompositeKey>, sink: BamSink) -> Self {
        Self { key, sink, records: 0 }
    }

    /// The output's key, or `None` for the overflow output.
    #[must_use]
    pub fn key(&self) -> Option<&CompositeKey> {
        self.key.as_ref()
    }

    /// Path of the output file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.sink.path()
    }

    /// Records written so far.
    #[must_use]
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Whether the underlying sink holds a file descriptor.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.sink.is_open()
    }

    /// Write one record.
    ///
    /// # Errors
    /// Returns [`SplitError::HandleWrite`] if the sink cannot accept the record
    pub fn write(&mut self, record: &[u8]) -> Result<()> {
        self.sink.write_record(record).map_err(|source| SplitError::HandleWrite {
            path: self.sink.path().to_path_buf(),
            source,
        })?;
        self.records += 1;
        Ok(())
    }

    /// Release the descriptor, keeping the output resumable.
    ///
    /// # Errors
    /// Returns [`SplitError::HandleWrite`] if buffered data cannot be flushed
    pub fn suspend(&mut self) -> Result<()> {
        self.sink.suspend().map_err(|source| SplitError::HandleWrite {
            path: self.sink.path().to_path_buf(),
            source,
        })
    }

    /// Reopen a suspended output.
    ///
    /// # Errors
    /// Returns [`SplitError::HandleOpen`] if the file cannot be reopened
    pub fn resume(&mut self) -> Result<()> {
        self.sink.resume().map_err(|source| SplitError::HandleOpen {
            path: self.sink.path().to_path_buf(),
            source,
        })
    }

    /// Finish the output. On failure the path is returned alongside the error.
    pub fn finish(self) -> std::result::Result<OutputSummary, (PathBuf, io::Error)> {
        let path = self.sink.path().to_path_buf();
        match self.sink.finish() {
            Ok(()) => Ok(OutputSummary { key: self.key, path, records: self.records }),
            Err(e) => Err((path, e)),
        }
    }
}
