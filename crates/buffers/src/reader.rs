//! Bit-granular buffer reader with cursor tracking.

use crate::BufferError;

/// Order in which multi-byte bit reads are assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    /// First byte read lands in the most significant position.
    Big,
    /// First byte read lands in the least significant position.
    Little,
}

/// Reads bit-packed data from a byte slice.
///
/// Bits are always taken from the low end of the current byte first; the
/// [`Endian`] only decides where each chunk lands in the assembled value.
///
/// # Example
///
/// ```
/// use hots_lambda_buffers::{BitReader, Endian};
///
/// let data = [0b1010_0110, 0x12, 0x34];
/// let mut reader = BitReader::new(&data, Endian::Big);
///
/// assert_eq!(reader.read_bits(3).unwrap(), 0b110);
/// assert_eq!(reader.read_bits(5).unwrap(), 0b10100);
/// assert_eq!(reader.read_bits(16).unwrap(), 0x1234);
/// assert!(reader.done());
/// ```
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    /// Whole bytes pulled from `data`.
    used: usize,
    /// Unread remainder of the last pulled byte, low bits first.
    next: u32,
    next_bits: u32,
    endian: Endian,
}

impl<'a> BitReader<'a> {
    /// Creates a new reader over `data`.
    pub fn new(data: &'a [u8], endian: Endian) -> Self {
        Self {
            data,
            used: 0,
            next: 0,
            next_bits: 0,
            endian,
        }
    }

    /// Creates a big-endian reader, the layout used by replay streams.
    pub fn big(data: &'a [u8]) -> Self {
        Self::new(data, Endian::Big)
    }

    /// Creates a little-endian reader.
    pub fn little(data: &'a [u8]) -> Self {
        Self::new(data, Endian::Little)
    }

    /// Returns `true` once every bit of the input has been consumed.
    pub fn done(&self) -> bool {
        self.next_bits == 0 && self.used >= self.data.len()
    }

    /// Number of bits consumed so far.
    pub fn used_bits(&self) -> u64 {
        self.used as u64 * 8 - u64::from(self.next_bits)
    }

    /// Number of whole bytes not yet pulled from the input.
    pub fn remaining_bytes(&self) -> usize {
        self.data.len().saturating_sub(self.used)
    }

    /// Drops any unread bits of the current byte.
    pub fn byte_align(&mut self) {
        self.next_bits = 0;
    }

    /// Aligns to the next byte boundary and returns the next `count` bytes.
    pub fn read_aligned_bytes(&mut self, count: usize) -> Result<&'a [u8], BufferError> {
        self.byte_align();
        let end = self
            .used
            .checked_add(count)
            .filter(|end| *end <= self.data.len())
            .ok_or(BufferError::EndOfBuffer)?;
        let bytes = &self.data[self.used..end];
        self.used = end;
        Ok(bytes)
    }

    /// Reads `bits` bits (at most 64) into an unsigned integer.
    pub fn read_bits(&mut self, bits: u32) -> Result<u64, BufferError> {
        if bits > 64 {
            return Err(BufferError::TooWide(bits));
        }
        let mut result: u64 = 0;
        let mut result_bits: u32 = 0;
        while result_bits != bits {
            if self.next_bits == 0 {
                if self.done() {
                    return Err(BufferError::EndOfBuffer);
                }
                self.next = u32::from(self.data[self.used]);
                self.used += 1;
                self.next_bits = 8;
            }
            let copy_bits = (bits - result_bits).min(self.next_bits);
            let copy = u64::from(self.next & ((1 << copy_bits) - 1));
            match self.endian {
                Endian::Big => result |= copy << (bits - result_bits - copy_bits),
                Endian::Little => result |= copy << result_bits,
            }
            self.next >>= copy_bits;
            self.next_bits -= copy_bits;
            result_bits += copy_bits;
        }
        Ok(result)
    }

    /// Reads `count` bytes without aligning first.
    pub fn read_unaligned_bytes(&mut self, count: usize) -> Result<Vec<u8>, BufferError> {
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.read_bits(8)? as u8);
        }
        Ok(out)
    }
}
