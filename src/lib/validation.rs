//! Input validation utilities
//!
//! Checks for command-line parameters, input files, and the keys that become output path
//! components. All failures use the structured variants from [`crate::errors`].

use crate::errors::{Result, SplitError};
use std::fmt::Display;
use std::path::Path;

/// File name of the overflow output written in tolerant mode.
pub const OVERFLOW_FILE_NAME: &str = "unmatched.bam";

/// Validate that a file exists
///
/// # Errors
/// Returns an error if the file does not exist
///
/// # Example
/// ```
/// use bamsplit_lib::validation::validate_file_exists;
///
/// let result = validate_file_exists("/nonexistent/file.bam", "Input BAM");
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        return Err(SplitError::InvalidFileFormat {
            file_type: description.to_string(),
            path: path_ref.display().to_string(),
            reason: "File does not exist".to_string(),
        });
    }
    Ok(())
}

/// Validate that a value is strictly positive
///
/// # Errors
/// Returns an error if `value` is zero or negative
///
/// # Example
/// ```
/// use bamsplit_lib::validation::validate_positive;
///
/// assert!(validate_positive(10u64, "progress-interval").is_ok());
/// assert!(validate_positive(0u64, "progress-interval").is_err());
/// ```
pub fn validate_positive<T: Ord + Display + Default>(value: T, name: &str) -> Result<()> {
    if value <= T::default() {
        return Err(SplitError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("must be > 0, got {value}"),
        });
    }
    Ok(())
}

/// Validate that a value lies in `[min, max]`
///
/// # Errors
/// Returns an error if the value is outside the range
pub fn validate_in_range<T: Ord + Display>(value: T, min: T, max: T, name: &str) -> Result<()> {
    if value < min || value > max {
        return Err(SplitError::InvalidParameter {
            parameter: name.to_string(),
            reason: format!("must be between {min} and {max}, got {value}"),
        });
    }
    Ok(())
}

/// Validate that `key` can be used as a single file or directory name.
///
/// Rejects empty keys, `.` and `..`, and keys containing a path separator or NUL.
///
/// # Errors
/// Returns [`SplitError::InvalidKey`] describing the first problem found
///
/// # Example
/// ```
/// use bamsplit_lib::validation::validate_path_component;
///
/// assert!(validate_path_component("chr1").is_ok());
/// assert!(validate_path_component("HLA-A*01:01").is_ok());
/// assert!(validate_path_component("../etc").is_err());
/// ```
pub fn validate_path_component(key: &str) -> Result<()> {
    let reason = if key.is_empty() {
        Some("key is empty")
    } else if key == "." || key == ".." {
        Some("key is a relative directory reference")
    } else if key.contains('/') || key.contains('\\') {
        Some("key contains a path separator")
    } else if key.contains('\0') {
        Some("key contains a NUL byte")
    } else {
        None
    };

    match reason {
        Some(reason) => {
            Err(SplitError::InvalidKey { key: key.to_string(), reason: reason.to_string() })
        }
        None => Ok(()),
    }
}

/// Validate a read group ID, which names a directory next to the overflow output.
///
/// # Errors
/// Returns [`SplitError::InvalidKey`] if the ID is not a safe path component or would
/// collide with the overflow output
pub fn validate_read_group_key(key: &str) -> Result<()> {
    validate_path_component(key)?;
    if key == OVERFLOW_FILE_NAME {
        return Err(SplitError::InvalidKey {
            key: key.to_string(),
            reason: "key collides with the overflow output name".to_string(),
        });
    }
    Ok(())
}
