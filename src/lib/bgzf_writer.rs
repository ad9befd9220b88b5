//! Inline BGZF compression for output sinks.
//!
//! Each output owns an [`InlineBgzfCompressor`]. Uncompressed bytes accumulate until a
//! block is full, then the block is compressed with the `bgzf` crate (libdeflate backend)
//! and queued. The owner decides when queued blocks reach the file, which lets an output
//! be flushed and released mid-stream without writing the EOF marker.

use bgzf::{CompressionLevel, Compressor as BgzfCompressor};
use std::io;

/// Maximum uncompressed size for a BGZF block (64KB - header/footer overhead).
pub const BGZF_MAX_BLOCK_SIZE: usize = bgzf::BGZF_BLOCK_SIZE;

/// The 28-byte empty BGZF block that terminates every BGZF file.
pub const BGZF_EOF: [u8; 28] = [
    0x1f, 0x8b, 0x08, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0x06, 0x00, 0x42, 0x43, 0x02, 0x00,
    0x1b, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Default compression level used when an out-of-range level cannot be built.
const FALLBACK_COMPRESSION_LEVEL: u8 = 6;

/// Buffered BGZF compressor that queues complete blocks.
///
/// # Usage
///
/// ```
/// use bamsplit_lib::bgzf_writer::InlineBgzfCompressor;
///
/// let mut compressor = InlineBgzfCompressor::new(1).unwrap();
/// compressor.write_all(b"BAM\x01").unwrap();
/// compressor.flush().unwrap();
///
/// let mut out = Vec::new();
/// compressor.write_blocks_to(&mut out).unwrap();
/// assert_eq!(&out[0..2], &[0x1f, 0x8b]);
/// ```
pub struct InlineBgzfCompressor {
    /// Uncompressed bytes for the block being filled.
    buffer: Vec<u8>,
    compressor: BgzfCompressor,
    /// Compressed blocks not yet written out.
    completed_blocks: Vec<Vec<u8>>,
    /// Recycled block buffers.
    buffer_pool: Vec<Vec<u8>>,
}

impl std::fmt::Debug for InlineBgzfCompressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineBgzfCompressor")
            .field("buffered", &self.buffer.len())
            .field("pending_blocks", &self.completed_blocks.len())
            .finish_non_exhaustive()
    }
}

impl InlineBgzfCompressor {
    /// Create a new compressor. The level is clamped to 1-12.
    ///
    /// # Errors
    ///
    /// Returns an error if the `bgzf` crate rejects both the requested and the
    /// fallback compression level.
    pub fn new(compression_level: u32) -> io::Result<Self> {
        let level = compression_level.clamp(1, 12) as u8;
        let level = CompressionLevel::new(level)
            .or_else(|_| CompressionLevel::new(FALLBACK_COMPRESSION_LEVEL))
            .map_err(|e| io::Error::other(format!("invalid BGZF compression level: {e}")))?;
        Ok(Self {
            buffer: Vec::with_capacity(BGZF_MAX_BLOCK_SIZE),
            compressor: BgzfCompressor::new(level),
            completed_blocks: Vec::new(),
            buffer_pool: Vec::new(),
        })
    }

    /// Write data to the compressor, compressing each time the buffer fills.
    pub fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let mut offset = 0;

        while offset < data.len() {
            let remaining_in_buffer = BGZF_MAX_BLOCK_SIZE - self.buffer.len();
            let to_copy = remaining_in_buffer.min(data.len() - offset);

            self.buffer.extend_from_slice(&data[offset..offset + to_copy]);
            offset += to_copy;

            if self.buffer.len() >= BGZF_MAX_BLOCK_SIZE {
                self.compress_current_buffer()?;
            }
        }

        Ok(())
    }

    /// Compress whatever is buffered into a (possibly short) block.
    ///
    /// Never produces an empty block.
    pub fn flush(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            self.compress_current_buffer()?;
        }
        Ok(())
    }

    /// Write all queued blocks to `output` and recycle their buffers.
    pub fn write_blocks_to<W: io::Write + ?Sized>(&mut self, output: &mut W) -> io::Result<()> {
        for mut block in self.completed_blocks.drain(..) {
            output.write_all(&block)?;
            block.clear();
            self.buffer_pool.push(block);
        }
        Ok(())
    }

    fn compress_current_buffer(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let mut compressed_data = self.buffer_pool.pop().unwrap_or_default();
        compressed_data.clear();

        self.compressor
            .compress(&self.buffer, &mut compressed_data)
            .map_err(|e| io::Error::other(format!("BGZF compression failed: {e}")))?;

        self.completed_blocks.push(compressed_data);
        self.buffer.clear();

        Ok(())
    }
}
