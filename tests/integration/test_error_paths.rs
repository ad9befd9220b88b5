//! Error path integration tests.
//!
//! Setup errors must be reported before any output exists, and a record without an output
//! must stop the run unless unknown keys are tolerated.

use bamsplit_lib::errors::SplitError;
use bamsplit_lib::progress::LogProgress;
use bamsplit_lib::split::{SplitConfig, run_split};
use tempfile::TempDir;

use crate::helpers::*;

fn setup(read_groups: &[&str], index: &[&str]) -> (TempDir, SplitConfig) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let header = create_standard_header(read_groups);
    let records = vec![
        create_record("r1", Some(0), 1, read_groups.first().copied()),
        create_record("r2", Some(1), 1, read_groups.first().copied()),
    ];
    write_bam(&dir.path().join("input.bam"), &header, &records);
    write_index(&dir.path().join("ref.fa.fai"), index);
    let config = SplitConfig::new(
        dir.path().join("input.bam"),
        dir.path().join("ref.fa.fai"),
        dir.path().join("split"),
    );
    (dir, config)
}

#[test]
fn test_missing_input() {
    let (dir, mut config) = setup(&["A"], &["chr1"]);
    config.input = dir.path().join("missing.bam");

    let err = run_split(&config, &LogProgress).unwrap_err();
    assert!(matches!(err, SplitError::InvalidFileFormat { .. }), "{err}");
    assert!(!config.output.exists());
}

#[test]
fn test_missing_index_creates_nothing() {
    let (dir, mut config) = setup(&["A"], &["chr1"]);
    config.index = dir.path().join("missing.fai");

    let err = run_split(&config, &LogProgress).unwrap_err();
    assert!(matches!(err, SplitError::MissingIndex { .. }), "{err}");
    assert!(!config.output.exists());
}

#[test]
fn test_empty_index_creates_nothing() {
    let (_dir, config) = setup(&["A"], &[]);

    let err = run_split(&config, &LogProgress).unwrap_err();
    assert!(matches!(err, SplitError::MissingIndex { .. }), "{err}");
    assert!(!config.output.exists());
}

#[test]
fn test_no_read_groups_creates_nothing() {
    let (_dir, config) = setup(&[], &["chr1", "chr2"]);

    let err = run_split(&config, &LogProgress).unwrap_err();
    assert!(matches!(err, SplitError::NoReadGroups { .. }), "{err}");
    assert!(!config.output.exists());
}

#[test]
fn test_unsafe_read_group_creates_nothing() {
    let (_dir, config) = setup(&["../escape"], &["chr1", "chr2"]);

    let err = run_split(&config, &LogProgress).unwrap_err();
    assert!(matches!(err, SplitError::InvalidKey { .. }), "{err}");
    assert!(!config.output.exists());
}

#[test]
fn test_unknown_reference_is_fatal() {
    // r2 lies on chr2, which the index does not list
    let (_dir, config) = setup(&["A"], &["chr1"]);

    let err = run_split(&config, &LogProgress).unwrap_err();
    match err {
        SplitError::UnknownKey { record, reference, read_group } => {
            assert_eq!(record, "r2");
            assert_eq!(reference, "chr2");
            assert_eq!(read_group, "A");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_invalid_compression_level() {
    let (_dir, mut config) = setup(&["A"], &["chr1", "chr2"]);
    config.compression_level = 0;

    let err = run_split(&config, &LogProgress).unwrap_err();
    assert!(matches!(err, SplitError::InvalidParameter { .. }), "{err}");
}

#[test]
fn test_zero_max_open_handles() {
    let (_dir, mut config) = setup(&["A"], &["chr1", "chr2"]);
    config.max_open_handles = Some(0);

    let err = run_split(&config, &LogProgress).unwrap_err();
    assert!(matches!(err, SplitError::InvalidParameter { .. }), "{err}");
    assert!(!config.output.exists());
}

#[test]
fn test_output_is_a_file() {
    let (_dir, config) = setup(&["A"], &["chr1", "chr2"]);
    std::fs::write(&config.output, b"not a directory").unwrap();

    let err = run_split(&config, &LogProgress).unwrap_err();
    assert!(matches!(err, SplitError::DirectoryCreate { .. }), "{err}");
}

#[test]
fn test_not_a_bam() {
    let (_dir, config) = setup(&["A"], &["chr1", "chr2"]);
    std::fs::write(&config.input, b"@HD\tVN:1.6\n").unwrap();

    let err = run_split(&config, &LogProgress).unwrap_err();
    assert!(matches!(err, SplitError::InvalidFileFormat { .. }), "{err}");
    assert!(!config.output.exists());
}
