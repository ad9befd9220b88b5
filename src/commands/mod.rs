//! CLI command implementations for bamsplit.
//!
//! - [`split`] - Split a BAM by read group and reference

pub mod command;
pub mod common;
pub mod split;
