//! End-to-end tests of `run_split` through the library API.

use bamsplit_lib::engine::EngineStats;
use bamsplit_lib::metrics::SplitMetric;
use bamsplit_lib::progress::{LogProgress, ProgressObserver};
use bamsplit_lib::split::{SplitConfig, run_split};
use fgoxide::io::DelimFile;
use noodles::sam::alignment::RecordBuf;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

use crate::helpers::*;

/// Input BAM and index inside a temp dir.
struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new(read_groups: &[&str], records: &[RecordBuf]) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let header = create_standard_header(read_groups);
        write_bam(&dir.path().join("input.bam"), &header, records);
        write_index(&dir.path().join("ref.fa.fai"), &["chr1", "chr2"]);
        Self { dir }
    }

    fn input(&self) -> PathBuf {
        self.dir.path().join("input.bam")
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("split")
    }

    fn config(&self) -> SplitConfig {
        SplitConfig::new(self.input(), self.dir.path().join("ref.fa.fai"), self.output())
    }
}

/// Mixed records restricted to chr1 and chr2.
fn indexed_records(count: usize) -> Vec<RecordBuf> {
    create_mixed_records(count).into_iter().filter(|r| r.reference_sequence_id() != Some(2)).collect()
}

/// Input records grouped by `<rg>/<ref>.bam`, in input order.
fn expected_partition(input: &Path) -> BTreeMap<String, Vec<Vec<u8>>> {
    let (header, _) = read_bam(input);
    let names: Vec<String> = header
        .reference_sequences()
        .keys()
        .map(|n| String::from_utf8_lossy(n).into_owned())
        .collect();

    let mut partition: BTreeMap<String, Vec<Vec<u8>>> = BTreeMap::new();
    for record in read_raw_records(input) {
        let tid = usize::try_from(bamsplit_raw::ref_id(&record)).unwrap();
        let key = format!("{}/{}.bam", raw_read_group(&record), names[tid]);
        partition.entry(key).or_default().push(record);
    }
    partition
}

#[test]
fn test_three_record_scenario() {
    let records = vec![
        create_record("r1", Some(0), 10, Some("A")),
        create_record("r2", Some(0), 20, Some("B")),
        create_record("r3", Some(1), 30, Some("A")),
    ];
    let fixture = Fixture::new(&["A", "B"], &records);

    let summary = run_split(&fixture.config(), &LogProgress).unwrap();

    assert_eq!(summary.stats, EngineStats { records: 3, routed: 3, unmatched: 0 });
    assert_eq!(
        list_outputs(&fixture.output()),
        vec!["A/chr1.bam", "A/chr2.bam", "B/chr1.bam", "B/chr2.bam"]
    );
    let counts: Vec<usize> = ["A/chr1.bam", "B/chr1.bam", "A/chr2.bam", "B/chr2.bam"]
        .iter()
        .map(|p| read_raw_records(&fixture.output().join(p)).len())
        .collect();
    assert_eq!(counts, vec![1, 1, 1, 0]);
    assert_eq!(summary.empty_outputs(), 1);

    // chr3 is in the header but not the index
    assert!(!output_path(&fixture.output(), "A", "chr3").exists());
}

#[test]
fn test_every_record_lands_once_in_source_order() {
    let fixture = Fixture::new(&["A", "B", "C"], &indexed_records(90));

    let summary = run_split(&fixture.config(), &LogProgress).unwrap();
    assert_eq!(summary.stats.records, 60);
    assert_eq!(summary.outputs.len(), 6);

    let actual = read_all_outputs(&fixture.output());
    let expected = expected_partition(&fixture.input());

    for (path, records) in &actual {
        let want = expected.get(path).cloned().unwrap_or_default();
        assert_eq!(records, &want, "records differ in {path}");
    }
    let total: usize = actual.values().map(Vec::len).sum();
    assert_eq!(total, 60);
    assert_eq!(actual.len(), 6);
}

#[test]
fn test_outputs_carry_source_header_and_pg() {
    let fixture = Fixture::new(&["A", "B"], &[create_record("r1", Some(0), 1, Some("A"))]);
    let (source_header, _) = read_bam(&fixture.input());

    let mut config = fixture.config();
    config.command_line = "bamsplit split -i input.bam".to_string();
    run_split(&config, &LogProgress).unwrap();

    for relative in list_outputs(&fixture.output()) {
        let path = fixture.output().join(&relative);
        assert_header_matches_source(&path, &source_header);

        let (header, _) = read_bam(&path);
        let programs = header.programs();
        let pg = programs.as_ref().get(b"bamsplit".as_slice()).expect("bamsplit @PG");
        let pp = pg
            .other_fields()
            .get(&noodles::sam::header::record::value::map::program::tag::PREVIOUS_PROGRAM_ID)
            .map(ToString::to_string);
        assert_eq!(pp.as_deref(), Some("bwa"));
    }
}

#[test]
fn test_no_pg_leaves_programs_untouched() {
    let fixture = Fixture::new(&["A"], &[create_record("r1", Some(0), 1, Some("A"))]);
    let mut config = fixture.config();
    config.add_pg = false;
    run_split(&config, &LogProgress).unwrap();

    let (header, _) = read_bam(&output_path(&fixture.output(), "A", "chr1"));
    assert_eq!(header.programs().as_ref().len(), 1);
}

#[test]
fn test_rerun_truncates_outputs() {
    let fixture = Fixture::new(&["A", "B", "C"], &indexed_records(90));
    run_split(&fixture.config(), &LogProgress).unwrap();
    let first_total: usize = read_all_outputs(&fixture.output()).values().map(Vec::len).sum();
    assert_eq!(first_total, 60);

    // Rerun on a smaller input into the same directory
    let header = create_standard_header(&["A", "B", "C"]);
    write_bam(&fixture.input(), &header, &indexed_records(9));
    let summary = run_split(&fixture.config(), &LogProgress).unwrap();
    assert_eq!(summary.stats.records, 6);

    let actual = read_all_outputs(&fixture.output());
    let expected = expected_partition(&fixture.input());
    for (path, records) in &actual {
        let want = expected.get(path).cloned().unwrap_or_default();
        assert_eq!(records, &want, "stale records left in {path}");
    }
    let total: usize = actual.values().map(Vec::len).sum();
    assert_eq!(total, 6);
}

#[test]
fn test_handle_pool_matches_all_open() {
    let fixture = Fixture::new(&["A", "B", "C"], &indexed_records(120));

    run_split(&fixture.config(), &LogProgress).unwrap();
    let all_open = read_all_outputs(&fixture.output());

    for max_open_handles in [1, 2, 5] {
        let mut config = fixture.config();
        config.output = fixture.dir.path().join(format!("pooled_{max_open_handles}"));
        config.max_open_handles = Some(max_open_handles);
        run_split(&config, &LogProgress).unwrap();

        assert_eq!(read_all_outputs(&config.output), all_open, "max {max_open_handles}");
    }
}

#[test]
fn test_tolerant_mode_writes_overflow_and_metrics() {
    let records = vec![
        create_record("ok", Some(0), 1, Some("A")),
        create_record("off_index", Some(2), 1, Some("A")),
        create_record("unmapped", None, 0, Some("B")),
        create_record("no_rg", Some(1), 1, None),
        create_record("undeclared_rg", Some(1), 2, Some("Z")),
        create_record("ok2", Some(1), 3, Some("B")),
    ];
    let fixture = Fixture::new(&["A", "B"], &records);

    let metrics = fixture.dir.path().join("split_metrics.txt");
    let mut config = fixture.config();
    config.tolerate_unknown_keys = true;
    config.metrics = Some(metrics.clone());
    let summary = run_split(&config, &LogProgress).unwrap();

    assert_eq!(summary.stats, EngineStats { records: 6, routed: 2, unmatched: 4 });
    let overflow = read_raw_records(&fixture.output().join("unmatched.bam"));
    let names: Vec<String> = overflow.iter().map(|r| raw_name(r)).collect();
    assert_eq!(names, vec!["off_index", "unmapped", "no_rg", "undeclared_rg"]);

    let rows: Vec<SplitMetric> = DelimFile::default().read_tsv(&metrics).unwrap();
    assert_eq!(rows.len(), 5);
    let last = rows.last().unwrap();
    assert_eq!((last.read_group.as_str(), last.reference.as_str(), last.records), ("*", "*", 4));
    let total: u64 = rows.iter().map(|r| r.records).sum();
    assert_eq!(total, 6);
}

#[test]
fn test_multithreaded_matches_single_threaded() {
    let fixture = Fixture::new(&["A", "B", "C"], &indexed_records(200));

    run_split(&fixture.config(), &LogProgress).unwrap();
    let single = read_all_outputs(&fixture.output());

    let mut config = fixture.config();
    config.output = fixture.dir.path().join("threaded");
    config.threads = 4;
    run_split(&config, &LogProgress).unwrap();

    assert_eq!(read_all_outputs(&config.output), single);
}

#[derive(Default)]
struct Recorder {
    records: Mutex<Vec<u64>>,
    closed: Mutex<Vec<(u64, u64)>>,
}

impl ProgressObserver for Recorder {
    fn records_processed(&self, count: u64, _elapsed: Duration) {
        self.records.lock().unwrap().push(count);
    }

    fn handles_closed(&self, closed: u64, total: u64) {
        self.closed.lock().unwrap().push((closed, total));
    }
}

#[test]
fn test_progress_observer_cadence() {
    let fixture = Fixture::new(&["A", "B", "C"], &indexed_records(75));

    let mut config = fixture.config();
    config.progress_interval = 20;
    config.close_progress_interval = 4;
    let recorder = Recorder::default();
    run_split(&config, &recorder).unwrap();

    assert_eq!(*recorder.records.lock().unwrap(), vec![20, 40]);
    assert_eq!(*recorder.closed.lock().unwrap(), vec![(4, 6)]);
}
