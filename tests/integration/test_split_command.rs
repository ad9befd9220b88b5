//! Integration tests for the split command.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

use crate::helpers::*;

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bamsplit"))
        .args(args)
        .output()
        .expect("Failed to run split command")
}

fn write_fixture(dir: &Path) {
    let header = create_standard_header(&["A", "B"]);
    let records = vec![
        create_record("r1", Some(0), 10, Some("A")),
        create_record("r2", Some(0), 20, Some("B")),
        create_record("r3", Some(1), 30, Some("A")),
        create_record("r4", Some(2), 40, Some("B")),
    ];
    write_bam(&dir.join("input.bam"), &header, &records);
    write_index(&dir.join("ref.fa.fai"), &["chr1", "chr2"]);
}

#[test]
fn test_split_help() {
    let output = run(&["split", "--help"]);
    assert!(output.status.success());
    let help = String::from_utf8_lossy(&output.stdout);
    assert!(help.contains("--max-open-handles"));
    assert!(help.contains("--tolerate-unknown-keys"));
}

#[test]
fn test_split_unknown_key_exits_non_zero() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_fixture(temp_dir.path());
    let input = temp_dir.path().join("input.bam");
    let index = temp_dir.path().join("ref.fa.fai");
    let out = temp_dir.path().join("split");

    let output = run(&[
        "split",
        "-i",
        input.to_str().unwrap(),
        "-x",
        index.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
    ]);

    assert!(!output.status.success(), "r4 lies on chr3, which is not indexed");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("r4"), "stderr: {stderr}");
    assert!(stderr.contains("chr3"), "stderr: {stderr}");
}

#[test]
fn test_split_tolerant_with_metrics() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_fixture(temp_dir.path());
    let input = temp_dir.path().join("input.bam");
    let index = temp_dir.path().join("ref.fa.fai");
    let out = temp_dir.path().join("split");
    let metrics = temp_dir.path().join("split_metrics.txt");

    let output = run(&[
        "split",
        "-i",
        input.to_str().unwrap(),
        "-x",
        index.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
        "--tolerate-unknown-keys",
        "--metrics",
        metrics.to_str().unwrap(),
        "--threads",
        "2",
        "--max-open-handles",
        "2",
        "--compression-level",
        "1",
    ]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        list_outputs(&out),
        vec!["A/chr1.bam", "A/chr2.bam", "B/chr1.bam", "B/chr2.bam", "unmatched.bam"]
    );
    assert_eq!(read_raw_records(&output_path(&out, "A", "chr1")).len(), 1);
    assert_eq!(read_raw_records(&output_path(&out, "B", "chr2")).len(), 0);

    let overflow = read_raw_records(&out.join("unmatched.bam"));
    assert_eq!(overflow.iter().map(|r| raw_name(r)).collect::<Vec<_>>(), vec!["r4"]);

    let text = std::fs::read_to_string(&metrics).unwrap();
    assert_eq!(text.lines().count(), 6);
    assert!(text.lines().last().unwrap().starts_with("*\t*\t"));
}

#[test]
fn test_split_records_command_line_in_pg() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_fixture(temp_dir.path());
    let input = temp_dir.path().join("input.bam");
    let index = temp_dir.path().join("ref.fa.fai");
    let out = temp_dir.path().join("split");

    let output = run(&[
        "split",
        "-i",
        input.to_str().unwrap(),
        "-x",
        index.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
        "--tolerate-unknown-keys",
    ]);
    assert!(output.status.success());

    let (header, _) = read_bam(&output_path(&out, "B", "chr1"));
    let programs = header.programs();
    let pg = programs.as_ref().get(b"bamsplit".as_slice()).expect("bamsplit @PG");
    let command_line = pg
        .other_fields()
        .get(&noodles::sam::header::record::value::map::program::tag::COMMAND_LINE)
        .map(ToString::to_string)
        .unwrap_or_default();
    assert!(command_line.contains("split"));
    assert!(command_line.contains("--tolerate-unknown-keys"));
}

#[test]
fn test_split_missing_index_exits_non_zero() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_fixture(temp_dir.path());
    let input = temp_dir.path().join("input.bam");
    let out = temp_dir.path().join("split");

    let output = run(&[
        "split",
        "-i",
        input.to_str().unwrap(),
        "-x",
        temp_dir.path().join("missing.fai").to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
    ]);

    assert!(!output.status.success());
    assert!(!out.exists());
}
