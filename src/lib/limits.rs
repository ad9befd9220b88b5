//! Open file descriptor budgeting.
//!
//! Every open output holds one descriptor for the whole run unless the handle pool is
//! enabled. The soft limit is raised toward the hard limit before any output is created,
//! and the run fails fast when even the hard limit is too low.

use log::{debug, info};

use crate::errors::{Result, SplitError};

/// Descriptors kept in reserve for the source, the index, stdio, and the allocator.
pub const RESERVED_DESCRIPTORS: u64 = 32;

/// Descriptors needed to hold `open_outputs` outputs open at once.
#[must_use]
pub fn required_descriptors(open_outputs: usize) -> u64 {
    open_outputs as u64 + RESERVED_DESCRIPTORS
}

/// Raise the soft open file limit to at least `required` if the hard limit allows it.
///
/// Returns the limit in effect afterwards.
///
/// # Errors
/// Returns [`SplitError::ResourceLimit`] if the limit cannot reach `required`
pub fn ensure_descriptor_limit(required: u64) -> Result<u64> {
    let available = match rlimit::increase_nofile_limit(required) {
        Ok(limit) => limit,
        Err(e) => {
            // Platforms without RLIMIT_NOFILE are not limited in a way we can query
            debug!("Could not query the open file limit: {e}");
            return Ok(required);
        }
    };

    if available < required {
        return Err(SplitError::ResourceLimit { required, available });
    }

    info!("Open file limit is {available} ({required} needed)");
    Ok(available)
}
