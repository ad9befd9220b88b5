//! Helpers for reading split outputs back and checking them.

#![allow(dead_code)]

use bamsplit_lib::bam_io::{RawRecord, create_raw_bam_reader};
use bamsplit_raw::{read_group, read_name};
use noodles::bam;
use noodles::sam::Header;
use noodles::sam::alignment::RecordBuf;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Reads the header and records of a BAM.
pub fn read_bam(path: &Path) -> (Header, Vec<RecordBuf>) {
    let mut reader = bam::io::reader::Builder.build_from_path(path).expect("Failed to open BAM");
    let header = reader.read_header().expect("Failed to read header");
    let records =
        reader.record_bufs(&header).map(|r| r.expect("Failed to read record")).collect();
    (header, records)
}

/// Reads the raw bytes of every record in a BAM, in file order.
pub fn read_raw_records(path: &Path) -> Vec<Vec<u8>> {
    let (mut reader, _) = create_raw_bam_reader(path, 1).expect("Failed to open BAM");
    let mut record = RawRecord::new();
    let mut records = Vec::new();
    while reader.read_record(&mut record).expect("Failed to read record") {
        records.push(record.to_vec());
    }
    records
}

/// Read name of a raw record.
pub fn raw_name(record: &[u8]) -> String {
    String::from_utf8_lossy(read_name(record)).into_owned()
}

/// Read group of a raw record, or `*` without one.
pub fn raw_read_group(record: &[u8]) -> String {
    read_group(record).map_or_else(|| "*".to_string(), |rg| String::from_utf8_lossy(rg).into_owned())
}

/// Path of the output for a pair.
pub fn output_path(root: &Path, read_group: &str, reference: &str) -> PathBuf {
    root.join(read_group).join(format!("{reference}.bam"))
}

/// Every `.bam` under `root`, relative to it, sorted.
pub fn list_outputs(root: &Path) -> Vec<String> {
    let mut outputs = Vec::new();
    for entry in walk(root) {
        if entry.extension().is_some_and(|ext| ext == "bam") {
            let relative = entry.strip_prefix(root).expect("under root");
            outputs.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }
    outputs.sort();
    outputs
}

fn walk(dir: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).expect("Failed to read directory") {
        let path = entry.expect("Failed to read entry").path();
        if path.is_dir() {
            paths.extend(walk(&path));
        } else {
            paths.push(path);
        }
    }
    paths
}

/// Raw records of every output under `root`, keyed by relative path.
pub fn read_all_outputs(root: &Path) -> BTreeMap<String, Vec<Vec<u8>>> {
    list_outputs(root)
        .into_iter()
        .map(|relative| {
            let records = read_raw_records(&root.join(&relative));
            (relative, records)
        })
        .collect()
}

/// Asserts an output has the source's references and read groups.
pub fn assert_header_matches_source(output: &Path, source: &Header) {
    let (header, _) = read_bam(output);
    assert_eq!(
        header.reference_sequences(),
        source.reference_sequences(),
        "reference catalog differs in {}",
        output.display()
    );
    assert_eq!(header.read_groups(), source.read_groups(), "read groups differ in {}", output.display());
}
