//! Custom error types for bamsplit operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for bamsplit operations
pub type Result<T> = std::result::Result<T, SplitError>;

/// Error type for bamsplit operations
#[derive(Error, Debug)]
pub enum SplitError {
    /// The reference index is absent, unreadable, malformed, or empty
    #[error("Invalid reference index '{path}': {reason}")]
    MissingIndex {
        /// Path to the index file
        path: PathBuf,
        /// Explanation of the problem
        reason: String,
    },

    /// The source header declares no read groups
    #[error("No @RG records found in header of '{path}'")]
    NoReadGroups {
        /// Path to the source BAM
        path: PathBuf,
    },

    /// A key cannot be used as a single path component
    #[error("Key '{key}' cannot be used as an output path component: {reason}")]
    InvalidKey {
        /// The offending key
        key: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// File format error
    #[error("Invalid {file_type} file '{path}': {reason}")]
    InvalidFileFormat {
        /// Type of file (e.g., "BAM", "index")
        file_type: String,
        /// Path to the file
        path: String,
        /// Explanation of the problem
        reason: String,
    },

    /// Not enough file descriptors for the requested outputs
    #[error(
        "Need {required} file descriptors but only {available} are available; \
         raise the open file limit or use --max-open-handles"
    )]
    ResourceLimit {
        /// Descriptors needed
        required: u64,
        /// Descriptors the process may open
        available: u64,
    },

    /// An output directory could not be created
    #[error("Failed to create output directory '{path}': {source}")]
    DirectoryCreate {
        /// The directory
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// An output could not be created or reopened
    #[error("Failed to open output '{path}': {source}")]
    HandleOpen {
        /// The output path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Writing to an output failed
    #[error("Failed to write output '{path}': {source}")]
    HandleWrite {
        /// The output path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Reading the source failed
    #[error("Failed to read record from '{path}': {source}")]
    ReadRecord {
        /// The source path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A record's keys do not map to any registered output
    #[error("Record '{record}' has no output for reference '{reference}' and read group '{read_group}'")]
    UnknownKey {
        /// The record name
        record: String,
        /// The record's reference, or `*` if unplaced
        reference: String,
        /// The record's read group, or `*` if absent
        read_group: String,
    },

    /// One or more outputs could not be finished
    #[error("Failed to close {count} output(s):\n{details}")]
    CloseFailures {
        /// Number of failed outputs
        count: usize,
        /// One line per failure
        details: String,
    },

    /// The metrics file could not be written
    #[error("Failed to write metrics '{path}': {reason}")]
    Metrics {
        /// Path to the metrics file
        path: PathBuf,
        /// Explanation of the problem
        reason: String,
    },
}
