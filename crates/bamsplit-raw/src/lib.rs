#![deny(unsafe_code)]

//! Zero-copy accessors for raw BAM record bytes.
//!
//! Records are the bytes following the 4-byte `block_size` prefix. Nothing here allocates
//! or decodes more than the requested field.

pub mod fields;
pub mod tags;

#[cfg(any(test, feature = "test-utils"))]
pub mod testutil;

pub use fields::*;
pub use tags::*;

#[cfg(any(test, feature = "test-utils"))]
pub use testutil::*;
