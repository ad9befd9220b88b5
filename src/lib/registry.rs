//! The routing table: one output per (reference, read group) pair.
//!
//! Slots are laid out read group major, `slot = read_group_index * |references| +
//! reference_index`, matching [`KeySets::cross_product`]. The optional overflow output
//! occupies the slot after the last pair.
//!
//! In pooled mode at most `max_open_handles` outputs hold a file descriptor. Writing to a
//! suspended output first suspends the least recently written open output.

use log::{debug, info};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::errors::{Result, SplitError};
use crate::keys::{CompositeKey, KeySets};
use crate::logging::format_count;
use crate::sink::{BamSink, OutputHandle};
use crate::validation::OVERFLOW_FILE_NAME;

/// Maps keys to output paths: `<root>/<read group>/<reference>.bam`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    /// Layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The output directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every output of one read group.
    #[must_use]
    pub fn read_group_dir(&self, read_group: &str) -> PathBuf {
        self.root.join(read_group)
    }

    /// Output path for one pair.
    #[must_use]
    pub fn path_for(&self, key: &CompositeKey) -> PathBuf {
        self.read_group_dir(&key.read_group).join(format!("{}.bam", key.reference))
    }

    /// Path of the overflow output.
    #[must_use]
    pub fn overflow_path(&self) -> PathBuf {
        self.root.join(OVERFLOW_FILE_NAME)
    }
}

/// Options controlling how outputs are created and held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOptions {
    /// BGZF compression level (1-12)
    pub compression_level: u32,
    /// Upper bound on simultaneously open outputs; `None` keeps every output open
    pub max_open_handles: Option<usize>,
    /// Whether to create the overflow output
    pub overflow: bool,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self { compression_level: 1, max_open_handles: None, overflow: false }
    }
}

impl RegistryOptions {
    /// Most outputs holding a descriptor at once for `outputs` outputs.
    ///
    /// In pool mode, shutdown reopens up to `close_threads` suspended outputs while the
    /// pooled ones are still open.
    #[must_use]
    pub fn open_outputs(&self, outputs: usize, close_threads: usize) -> usize {
        match self.max_open_handles {
            Some(n) if n < outputs => (n + close_threads).min(outputs),
            _ => outputs,
        }
    }
}

/// Fixed key-to-output routing table.
#[derive(Debug)]
pub struct RoutingTable {
    key_sets: KeySets,
    /// Pair outputs in slot order, then the overflow output if present.
    handles: Vec<OutputHandle>,
    overflow_slot: Option<usize>,
    pool: Option<LruCache<usize, ()>>,
}

impl RoutingTable {
    /// Create every output directory and every output, each seeded with `header_bytes`.
    ///
    /// An existing output directory is reused and existing outputs are truncated.
    ///
    /// # Errors
    /// - [`SplitError::InvalidParameter`] if `max_open_handles` is zero
    /// - [`SplitError::DirectoryCreate`] if a directory cannot be created
    /// - [`SplitError::HandleOpen`] if an output cannot be created
    pub fn build(
        layout: &OutputLayout,
        key_sets: KeySets,
        header_bytes: &[u8],
        options: &RegistryOptions,
    ) -> Result<Self> {
        if options.max_open_handles == Some(0) {
            return Err(SplitError::InvalidParameter {
                parameter: "max-open-handles".to_string(),
                reason: "must be > 0".to_string(),
            });
        }

        let total = key_sets.len() + usize::from(options.overflow);
        let pool = options
            .max_open_handles
            .filter(|&n| n < total)
            .and_then(NonZeroUsize::new)
            .map(LruCache::new);
        let pooled = pool.is_some();

        create_dir(layout.root())?;
        for read_group in &key_sets.read_groups {
            create_dir(&layout.read_group_dir(read_group))?;
        }

        let open = |path: PathBuf, key: Option<CompositeKey>| -> Result<OutputHandle> {
            let sink = BamSink::create(&path, header_bytes, options.compression_level)
                .map_err(|source| SplitError::HandleOpen { path: path.clone(), source })?;
            let mut handle = OutputHandle::new(key, sink);
            if pooled {
                handle.suspend()?;
            }
            Ok(handle)
        };

        let mut handles = Vec::with_capacity(total);
        for key in key_sets.cross_product() {
            handles.push(open(layout.path_for(&key), Some(key))?);
        }

        let overflow_slot = if options.overflow {
            handles.push(open(layout.overflow_path(), None)?);
            Some(handles.len() - 1)
        } else {
            None
        };

        info!(
            "Created {} outputs under {}{}",
            format_count(handles.len() as u64),
            layout.root().display(),
            pool.as_ref()
                .map(|p| format!(" (at most {} open at once)", p.cap()))
                .unwrap_or_default()
        );

        Ok(Self { key_sets, handles, overflow_slot, pool })
    }

    /// The key sets the table was built from.
    #[must_use]
    pub fn key_sets(&self) -> &KeySets {
        &self.key_sets
    }

    /// Slot of the pair at the given key set positions.
    #[inline]
    #[must_use]
    pub fn slot(&self, reference_index: usize, read_group_index: usize) -> usize {
        read_group_index * self.key_sets.references.len() + reference_index
    }

    /// Slot of the pair with the given names, if both are registered.
    #[must_use]
    pub fn slot_of(&self, reference: &str, read_group: &str) -> Option<usize> {
        let reference_index = self.key_sets.reference_index(reference)?;
        let read_group_index = self.key_sets.read_group_index(read_group)?;
        Some(self.slot(reference_index, read_group_index))
    }

    /// Slot of the overflow output, if one was created.
    #[must_use]
    pub fn overflow_slot(&self) -> Option<usize> {
        self.overflow_slot
    }

    /// The output registered for a pair.
    ///
    /// # Errors
    /// Returns [`SplitError::UnknownKey`] if the pair was never registered
    pub fn lookup(&self, reference: &str, read_group: &str) -> Result<&OutputHandle> {
        self.slot_of(reference, read_group).map(|slot| &self.handles[slot]).ok_or_else(|| {
            SplitError::UnknownKey {
                record: "*".to_string(),
                reference: reference.to_string(),
                read_group: read_group.to_string(),
            }
        })
    }

    /// Every output, pairs in slot order followed by the overflow output.
    #[must_use]
    pub fn handles(&self) -> &[OutputHandle] {
        &self.handles
    }

    /// Number of outputs, including the overflow output.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the table has no outputs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Number of outputs currently holding a file descriptor.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.handles.iter().filter(|h| h.is_open()).count()
    }

    /// Write one record to the output in `slot`.
    ///
    /// # Errors
    /// - [`SplitError::HandleWrite`] if the write, or suspending an evicted output, fails
    /// - [`SplitError::HandleOpen`] if a suspended output cannot be reopened
    pub fn write(&mut self, slot: usize, record: &[u8]) -> Result<()> {
        if let Some(pool) = self.pool.as_mut() {
            if pool.get(&slot).is_none() {
                if pool.len() >= pool.cap().get() {
                    if let Some((victim, ())) = pool.pop_lru() {
                        self.handles[victim].suspend()?;
                        debug!("Evicted output slot {victim} for slot {slot}");
                    }
                }
                self.handles[slot].resume()?;
                pool.put(slot, ());
            }
        }
        self.handles[slot].write(record)
    }

    /// Consume the table, yielding every output for shutdown.
    #[must_use]
    pub fn into_handles(self) -> Vec<OutputHandle> {
        self.handles
    }
}

fn create_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .map_err(|source| SplitError::DirectoryCreate { path: path.to_path_buf(), source })
}
