//! Bit-level buffer utilities for replay decoding.
//!
//! Replay blobs pack their fields at bit granularity, so everything above
//! this crate reads through a [`BitReader`].
//!
//! # Example
//!
//! ```
//! use hots_lambda_buffers::BitReader;
//!
//! let data = [0x12, 0x34, 0x56];
//! let mut reader = BitReader::big(&data);
//! assert_eq!(reader.read_bits(16).unwrap(), 0x1234);
//! assert_eq!(reader.read_aligned_bytes(1).unwrap(), &[0x56]);
//! ```

mod reader;

pub use reader::{BitReader, Endian};

/// Error type for buffer operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// Attempted to read past the end of the buffer.
    EndOfBuffer,
    /// A single read asked for more bits than fit in a `u64`.
    TooWide(u32),
}

impl std::fmt::Display for BufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BufferError::EndOfBuffer => write!(f, "end of buffer"),
            BufferError::TooWide(bits) => write!(f, "cannot read {bits} bits at once"),
        }
    }
}

impl std::error::Error for BufferError {}
