//! Discovery of the two key sets that define the output space.
//!
//! References come from the first column of a tab-separated index (a FASTA `.fai` works
//! as is, gzipped input is accepted). Read groups come from the `@RG` records of the
//! source header. Both sets are deduplicated and sorted, and every output corresponds to
//! one element of their cross product.

use fgoxide::io::Io;
use noodles::sam::Header;
use std::collections::BTreeSet;
use std::io::BufRead;
use std::path::Path;

use crate::errors::{Result, SplitError};
use crate::validation::{validate_path_component, validate_read_group_key};

/// A (reference, read group) pair identifying one output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompositeKey {
    /// Reference sequence name
    pub reference: String,
    /// Read group ID
    pub read_group: String,
}

impl CompositeKey {
    /// Create a key from its parts.
    pub fn new(reference: impl Into<String>, read_group: impl Into<String>) -> Self {
        Self { reference: reference.into(), read_group: read_group.into() }
    }
}

impl std::fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.read_group, self.reference)
    }
}

/// The reference names and read group IDs, each deduplicated and sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySets {
    /// Reference names from the index
    pub references: Vec<String>,
    /// Read group IDs from the header
    pub read_groups: Vec<String>,
}

impl KeySets {
    /// Build key sets from arbitrary name lists, deduplicating and sorting both.
    pub fn new<A, B>(references: A, read_groups: B) -> Self
    where
        A: IntoIterator<Item = String>,
        B: IntoIterator<Item = String>,
    {
        let references: BTreeSet<String> = references.into_iter().collect();
        let read_groups: BTreeSet<String> = read_groups.into_iter().collect();
        Self {
            references: references.into_iter().collect(),
            read_groups: read_groups.into_iter().collect(),
        }
    }

    /// Number of (reference, read group) pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.references.len() * self.read_groups.len()
    }

    /// Whether either set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of `name` in the reference set.
    #[must_use]
    pub fn reference_index(&self, name: &str) -> Option<usize> {
        self.references.binary_search_by(|r| r.as_str().cmp(name)).ok()
    }

    /// Position of `id` in the read group set.
    #[must_use]
    pub fn read_group_index(&self, id: &str) -> Option<usize> {
        self.read_groups.binary_search_by(|r| r.as_str().cmp(id)).ok()
    }

    /// Every pair, read group major and reference minor.
    ///
    /// The n-th pair yielded lives in slot n of the routing table.
    pub fn cross_product(&self) -> impl Iterator<Item = CompositeKey> + '_ {
        self.read_groups.iter().flat_map(move |rg| {
            self.references.iter().map(move |reference| CompositeKey::new(reference, rg))
        })
    }

    /// Check every key can be used as a single path component.
    ///
    /// # Errors
    /// Returns [`SplitError::InvalidKey`] for the first unusable key
    pub fn validate(&self) -> Result<()> {
        for reference in &self.references {
            validate_path_component(reference)?;
        }
        for read_group in &self.read_groups {
            validate_read_group_key(read_group)?;
        }
        Ok(())
    }
}

/// Read reference names from column 0 of a tab-separated index.
///
/// Blank lines are skipped. Order of the returned names follows the file.
///
/// # Errors
/// Returns [`SplitError::MissingIndex`] if the file cannot be read or a non-blank line has
/// an empty first column
pub fn read_reference_names(index_path: &Path) -> Result<Vec<String>> {
    let missing = |reason: String| SplitError::MissingIndex { path: index_path.to_path_buf(), reason };

    let reader = Io::default().new_reader(&index_path).map_err(|e| missing(e.to_string()))?;

    let mut names = Vec::new();
    for (line_number, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| missing(e.to_string()))?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let name = line.split('\t').next().unwrap_or_default();
        if name.is_empty() {
            return Err(missing(format!("line {} has an empty first column", line_number + 1)));
        }
        names.push(name.to_string());
    }
    Ok(names)
}

/// Read group IDs declared in the header, in header order.
///
/// # Errors
/// Returns [`SplitError::InvalidKey`] for an ID that is not valid UTF-8
pub fn read_group_ids(header: &Header) -> Result<Vec<String>> {
    header
        .read_groups()
        .keys()
        .map(|id| {
            String::from_utf8(id.to_vec()).map_err(|_| SplitError::InvalidKey {
                key: String::from_utf8_lossy(id).into_owned(),
                reason: "read group ID is not valid UTF-8".to_string(),
            })
        })
        .collect()
}

/// Discover both key sets.
///
/// `source_path` is used only to name the source in errors.
///
/// # Errors
/// - [`SplitError::MissingIndex`] if the index is unreadable, malformed, or names nothing
/// - [`SplitError::NoReadGroups`] if the header has no `@RG` records
/// - [`SplitError::InvalidKey`] if a read group ID is not valid UTF-8
pub fn discover(index_path: &Path, source_path: &Path, header: &Header) -> Result<KeySets> {
    let references = read_reference_names(index_path)?;
    if references.is_empty() {
        return Err(SplitError::MissingIndex {
            path: index_path.to_path_buf(),
            reason: "no reference names found".to_string(),
        });
    }

    let read_groups = read_group_ids(header)?;
    if read_groups.is_empty() {
        return Err(SplitError::NoReadGroups { path: source_path.to_path_buf() });
    }

    Ok(KeySets::new(references, read_groups))
}
