//! The single pass that routes every source record to its output.
//!
//! Records are never decoded. The reference is resolved from the raw `refID` through a
//! table built from the source header, and the read group from the record's `RG:Z` tag.
//! Both resolve to positions in the [`KeySets`], which give the routing table slot
//! directly, so the loop performs no string comparisons beyond one hash lookup of the
//! read group.
//!
//! Records are written in source order, which keeps every output in source order.

use ahash::AHashMap;
use bamsplit_raw::{MIN_BAM_HEADER_LEN, UNPLACED_REF_ID, read_group, read_name, ref_id};
use noodles::sam::Header;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::bam_io::{RawBamReader, RawRecord};
use crate::errors::{Result, SplitError};
use crate::keys::KeySets;
use crate::progress::{ProgressObserver, ProgressTracker};
use crate::registry::RoutingTable;

/// Default number of records between progress reports.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1_000_000;

/// Counts from one pass over the source.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EngineStats {
    /// Records read from the source
    pub records: u64,
    /// Records written to the output of their own (reference, read group) pair
    pub routed: u64,
    /// Records written to the overflow output
    pub unmatched: u64,
}

/// Maps raw record fields to key set positions.
#[derive(Debug)]
struct KeyResolver {
    /// Reference name of each header reference, by `refID`
    reference_names: Vec<String>,
    /// Key set position of each header reference, by `refID`
    reference_positions: Vec<Option<usize>>,
    read_group_positions: AHashMap<Vec<u8>, usize>,
}

impl KeyResolver {
    fn new(header: &Header, key_sets: &KeySets) -> Self {
        let reference_names: Vec<String> = header
            .reference_sequences()
            .keys()
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .collect();
        let reference_positions =
            reference_names.iter().map(|name| key_sets.reference_index(name)).collect();
        let read_group_positions = key_sets
            .read_groups
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_bytes().to_vec(), i))
            .collect();
        Self { reference_names, reference_positions, read_group_positions }
    }

    fn reference(&self, record: &[u8]) -> Option<usize> {
        let tid = usize::try_from(ref_id(record)).ok()?;
        self.reference_positions.get(tid).copied().flatten()
    }

    fn read_group(&self, record: &[u8]) -> Option<usize> {
        read_group(record).and_then(|rg| self.read_group_positions.get(rg).copied())
    }

    fn reference_label(&self, record: &[u8]) -> String {
        let tid = ref_id(record);
        if tid == UNPLACED_REF_ID {
            return "*".to_string();
        }
        usize::try_from(tid)
            .ok()
            .and_then(|i| self.reference_names.get(i).cloned())
            .unwrap_or_else(|| format!("refID {tid}"))
    }

    fn unknown_key(&self, record: &[u8]) -> SplitError {
        SplitError::UnknownKey {
            record: String::from_utf8_lossy(read_name(record)).into_owned(),
            reference: self.reference_label(record),
            read_group: read_group(record)
                .map_or_else(|| "*".to_string(), |rg| String::from_utf8_lossy(rg).into_owned()),
        }
    }
}

/// Streams records from the source into a [`RoutingTable`].
///
/// A record whose reference is not in the index, whose reference is unplaced, or whose
/// read group is missing or undeclared has no output of its own. It goes to the table's
/// overflow output when there is one, and otherwise stops the run with
/// [`SplitError::UnknownKey`].
#[derive(Debug)]
pub struct DemuxEngine {
    resolver: KeyResolver,
    source: PathBuf,
    progress_interval: u64,
}

impl DemuxEngine {
    /// Prepare an engine for a source with `header`, routing into outputs for `key_sets`.
    ///
    /// `source` names the input in errors.
    #[must_use]
    pub fn new(header: &Header, key_sets: &KeySets, source: &Path, progress_interval: u64) -> Self {
        Self {
            resolver: KeyResolver::new(header, key_sets),
            source: source.to_path_buf(),
            progress_interval,
        }
    }

    /// Key set positions `(reference, read group)` of a raw record, if both resolve.
    #[must_use]
    pub fn resolve(&self, record: &[u8]) -> Option<(usize, usize)> {
        Some((self.resolver.reference(record)?, self.resolver.read_group(record)?))
    }

    /// Read every remaining record and write it to its output.
    ///
    /// # Errors
    /// - [`SplitError::ReadRecord`] if the source cannot be read
    /// - [`SplitError::InvalidFileFormat`] for a record too short to hold the fixed fields
    /// - [`SplitError::UnknownKey`] for an unresolvable record when there is no overflow
    ///   output
    /// - any error from [`RoutingTable::write`]
    pub fn run<R: Read>(
        &self,
        reader: &mut RawBamReader<R>,
        table: &mut RoutingTable,
        observer: &dyn ProgressObserver,
    ) -> Result<EngineStats> {
        let start = Instant::now();
        let tracker = ProgressTracker::new(self.progress_interval);
        let mut stats = EngineStats::default();
        let mut record = RawRecord::new();

        loop {
            let more = reader
                .read_record(&mut record)
                .map_err(|source| SplitError::ReadRecord { path: self.source.clone(), source })?;
            if !more {
                break;
            }

            if record.len() < MIN_BAM_HEADER_LEN {
                return Err(SplitError::InvalidFileFormat {
                    file_type: "BAM".to_string(),
                    path: self.source.display().to_string(),
                    reason: format!(
                        "record {} is {} bytes, shorter than the {MIN_BAM_HEADER_LEN} byte minimum",
                        stats.records + 1,
                        record.len()
                    ),
                });
            }

            let slot = match self.resolve(&record) {
                Some((reference, read_group)) => {
                    stats.routed += 1;
                    table.slot(reference, read_group)
                }
                None => {
                    let slot =
                        table.overflow_slot().ok_or_else(|| self.resolver.unknown_key(&record))?;
                    stats.unmatched += 1;
                    slot
                }
            };

            table.write(slot, &record)?;
            stats.records += 1;
            tracker.advance(1, |count| observer.records_processed(count, start.elapsed()));
        }

        Ok(stats)
    }
}
