//! Integration tests for bamsplit.
//!
//! These tests run whole splits, through the library and through the binary, and read
//! every output back.

mod helpers;
mod test_error_paths;
mod test_split_command;
mod test_split_library;
