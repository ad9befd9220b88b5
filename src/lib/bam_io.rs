//! BAM file I/O utilities.
//!
//! The source is read as raw records: the header is parsed once with noodles, after which
//! the decompressed stream is consumed as `block_size`-prefixed byte records that are
//! never decoded. Outputs receive a header that is encoded once with
//! [`encode_bam_header`] and then shared by every sink.
//!
//! # Threading Model
//!
//! - **Single-threaded**: `threads=1` decompresses the source on the calling thread.
//! - **Multi-threaded**: `threads>1` uses noodles' `MultithreadedReader`; the decompressed
//!   byte stream, and therefore the record order, is identical.

use noodles::sam::Header;
use noodles_bgzf::io::{MultithreadedReader, Reader as BgzfReader};
use std::fs::File;
use std::io::{self, BufRead, Read};
use std::num::NonZero;
use std::path::Path;

use crate::errors::{Result, SplitError};

/// BAM magic number.
const BAM_MAGIC: &[u8; 4] = b"BAM\x01";

/// Enum wrapping single-threaded and multi-threaded BGZF readers.
pub enum BgzfReaderEnum {
    /// Single-threaded BGZF reader (lower overhead for small files)
    SingleThreaded(BgzfReader<File>),
    /// Multi-threaded BGZF reader (noodles built-in threading)
    MultiThreaded(MultithreadedReader<File>),
}

impl Read for BgzfReaderEnum {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            BgzfReaderEnum::SingleThreaded(r) => r.read(buf),
            BgzfReaderEnum::MultiThreaded(r) => r.read(buf),
        }
    }
}

impl BufRead for BgzfReaderEnum {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self {
            BgzfReaderEnum::SingleThreaded(r) => r.fill_buf(),
            BgzfReaderEnum::MultiThreaded(r) => r.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            BgzfReaderEnum::SingleThreaded(r) => r.consume(amt),
            BgzfReaderEnum::MultiThreaded(r) => r.consume(amt),
        }
    }
}

/// A raw BAM record: the bytes following the 4-byte `block_size` prefix.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct RawRecord(Vec<u8>);

impl RawRecord {
    /// Creates a new empty raw record.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Returns the length of the record in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the record is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for RawRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RawRecord").field(&self.0.len()).finish()
    }
}

impl AsRef<[u8]> for RawRecord {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::ops::Deref for RawRecord {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<u8>> for RawRecord {
    #[inline]
    fn from(buf: Vec<u8>) -> Self {
        Self(buf)
    }
}

/// Reads the 4-byte block size prefix, or `None` at a clean end of stream.
fn read_block_size<R: Read>(reader: &mut R) -> io::Result<Option<usize>> {
    let mut buf = [0u8; 4];

    // A zero-byte read on the first byte is the only clean EOF
    loop {
        match reader.read(&mut buf[..1]) {
            Ok(0) => return Ok(None),
            Ok(_) => break,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    reader.read_exact(&mut buf[1..])?;

    let n = u32::from_le_bytes(buf);
    usize::try_from(n).map(Some).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Reader yielding raw BAM records from a decompressed stream positioned after the header.
pub struct RawBamReader<R> {
    inner: R,
}

impl<R: Read> RawBamReader<R> {
    /// Creates a new raw BAM reader. The header must already have been consumed.
    #[inline]
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Reads the next record into `record`, reusing its allocation.
    ///
    /// Returns `false` at end of stream.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the stream ends mid-record.
    #[inline]
    pub fn read_record(&mut self, record: &mut RawRecord) -> io::Result<bool> {
        let Some(block_size) = read_block_size(&mut self.inner)? else {
            return Ok(false);
        };

        record.0.resize(block_size, 0);
        self.inner.read_exact(&mut record.0)?;
        Ok(true)
    }
}

/// Type alias for a raw BAM reader over either BGZF reader flavour.
pub type RawBamReaderAuto = RawBamReader<BgzfReaderEnum>;

/// Open a BAM, parse its header, and return a raw record reader positioned at the first
/// record.
///
/// # Errors
///
/// Returns [`SplitError::InvalidFileFormat`] if the file cannot be opened or the header
/// cannot be read.
pub fn create_raw_bam_reader<P: AsRef<Path>>(
    path: P,
    threads: usize,
) -> Result<(RawBamReaderAuto, Header)> {
    let path_ref = path.as_ref();
    let invalid = |reason: String| SplitError::InvalidFileFormat {
        file_type: "BAM".to_string(),
        path: path_ref.display().to_string(),
        reason,
    };

    let file = File::open(path_ref).map_err(|e| invalid(format!("cannot open: {e}")))?;

    let bgzf_reader = match NonZero::new(threads) {
        Some(worker_count) if threads > 1 => BgzfReaderEnum::MultiThreaded(
            MultithreadedReader::with_worker_count(worker_count, file),
        ),
        _ => BgzfReaderEnum::SingleThreaded(BgzfReader::new(file)),
    };

    let mut noodles_reader = noodles::bam::io::Reader::from(bgzf_reader);
    let header = noodles_reader
        .read_header()
        .map_err(|e| invalid(format!("cannot read header: {e}")))?;

    Ok((RawBamReader::new(noodles_reader.into_inner()), header))
}

/// Encode the uncompressed BAM header block: magic, SAM text, and the binary reference
/// dictionary.
///
/// # Errors
///
/// Returns an error if the SAM text cannot be serialized or a length does not fit the
/// BAM field width.
pub fn encode_bam_header(header: &Header) -> io::Result<Vec<u8>> {
    let too_large = |what: &str| io::Error::new(io::ErrorKind::InvalidData, format!("{what} too large"));

    let mut sam_writer = noodles::sam::io::Writer::new(Vec::new());
    sam_writer.write_header(header)?;
    let text = sam_writer.into_inner();

    let mut buf = Vec::with_capacity(text.len() + 64);
    buf.extend_from_slice(BAM_MAGIC);

    let l_text = i32::try_from(text.len()).map_err(|_| too_large("header text"))?;
    buf.extend_from_slice(&l_text.to_le_bytes());
    buf.extend_from_slice(&text);

    let references = header.reference_sequences();
    let n_ref = i32::try_from(references.len()).map_err(|_| too_large("reference count"))?;
    buf.extend_from_slice(&n_ref.to_le_bytes());

    for (name, map) in references {
        // l_name includes the NUL terminator
        let l_name = u32::try_from(name.len() + 1).map_err(|_| too_large("reference name"))?;
        buf.extend_from_slice(&l_name.to_le_bytes());
        buf.extend_from_slice(name);
        buf.push(0);

        let l_ref = i32::try_from(map.length().get()).map_err(|_| too_large("reference length"))?;
        buf.extend_from_slice(&l_ref.to_le_bytes());
    }

    Ok(buf)
}
