//! MPQ archive reader.
//!
//! Replays are MPQ archives prefixed by a user data block that holds the
//! protocol header. Only what replays use is supported: unencrypted files
//! stored whole or split into sectors, zlib or bzip2 compressed.

use std::fmt;
use std::io::{self, Cursor, Read};
use std::sync::OnceLock;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use bzip2::read::BzDecoder;
use flate2::read::ZlibDecoder;
use thiserror::Error;

const USER_DATA_MAGIC: &[u8] = b"MPQ\x1b";
const HEADER_MAGIC: &[u8] = b"MPQ\x1a";

/// Hash table slot that was never used; ends a lookup.
const EMPTY: u32 = 0xFFFF_FFFF;
/// Hash table slot whose file was removed; lookups continue past it.
const DELETED: u32 = 0xFFFF_FFFE;

mod flags {
    pub const IMPLODE: u32 = 0x0000_0100;
    pub const COMPRESS: u32 = 0x0000_0200;
    pub const ENCRYPTED: u32 = 0x0001_0000;
    pub const SINGLE_UNIT: u32 = 0x0100_0000;
    pub const EXISTS: u32 = 0x8000_0000;
}

mod compression {
    pub const ZLIB: u8 = 0x02;
    pub const BZIP2: u8 = 0x10;
}

#[derive(Debug, Error)]
pub enum MpqError {
    #[error("missing MPQ signature")]
    BadMagic,
    #[error("archive is truncated")]
    Truncated,
    #[error("archive has no user data header")]
    MissingUserData,
    #[error("sector size shift {0} is out of range")]
    SectorSize(u16),
    #[error("unsupported file flags {0:#010x}")]
    UnsupportedFlags(u32),
    #[error("unsupported compression type {0:#04x}")]
    UnsupportedCompression(u8),
    #[error("failed to decompress file data")]
    Decompress(#[source] io::Error),
}

// Table and header reads go through in-memory cursors, which only fail at
// the end of their input.
impl From<io::Error> for MpqError {
    fn from(_: io::Error) -> Self {
        MpqError::Truncated
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HashType {
    TableOffset = 0,
    HashA = 1,
    HashB = 2,
    Table = 3,
}

#[derive(Debug, Clone, Copy)]
struct HashEntry {
    hash_a: u32,
    hash_b: u32,
    block_index: u32,
}

#[derive(Debug, Clone, Copy)]
struct BlockEntry {
    offset: u32,
    archived_size: u32,
    size: u32,
    flags: u32,
}

/// An MPQ archive held in memory.
pub struct MpqArchive {
    data: Vec<u8>,
    user_data: Option<Vec<u8>>,
    header_offset: usize,
    sector_size: usize,
    hash_table: Vec<HashEntry>,
    block_table: Vec<BlockEntry>,
}

impl fmt::Debug for MpqArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MpqArchive")
            .field("len", &self.data.len())
            .field("header_offset", &self.header_offset)
            .field("files", &self.block_table.len())
            .finish()
    }
}

impl MpqArchive {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, MpqError> {
        let magic = data.get(..4).ok_or(MpqError::Truncated)?;
        let (user_data, header_offset) = if magic == USER_DATA_MAGIC {
            let mut cursor = Cursor::new(&data[4..]);
            cursor.read_u32::<LittleEndian>()?; // user data block size
            let header_offset = cursor.read_u32::<LittleEndian>()? as usize;
            let content_len = cursor.read_u32::<LittleEndian>()? as usize;
            let content = 16usize
                .checked_add(content_len)
                .and_then(|end| data.get(16..end))
                .ok_or(MpqError::Truncated)?;
            (Some(content.to_vec()), header_offset)
        } else {
            (None, 0)
        };

        let header = data.get(header_offset..).ok_or(MpqError::Truncated)?;
        if header.get(..4) != Some(HEADER_MAGIC) {
            return Err(MpqError::BadMagic);
        }
        let mut cursor = Cursor::new(&header[4..]);
        cursor.read_u32::<LittleEndian>()?; // header size
        cursor.read_u32::<LittleEndian>()?; // archive size
        cursor.read_u16::<LittleEndian>()?; // format version
        let sector_shift = cursor.read_u16::<LittleEndian>()?;
        let hash_table_offset = cursor.read_u32::<LittleEndian>()? as usize;
        let block_table_offset = cursor.read_u32::<LittleEndian>()? as usize;
        let hash_table_entries = cursor.read_u32::<LittleEndian>()? as usize;
        let block_table_entries = cursor.read_u32::<LittleEndian>()? as usize;
        if sector_shift > 23 {
            return Err(MpqError::SectorSize(sector_shift));
        }

        let hash_table = read_table(
            &data,
            header_offset + hash_table_offset,
            hash_table_entries,
            "(hash table)",
        )?
        .into_iter()
        .map(|[hash_a, hash_b, _locale, block_index]| HashEntry {
            hash_a,
            hash_b,
            block_index,
        })
        .collect();
        let block_table = read_table(
            &data,
            header_offset + block_table_offset,
            block_table_entries,
            "(block table)",
        )?
        .into_iter()
        .map(|[offset, archived_size, size, flags]| BlockEntry {
            offset,
            archived_size,
            size,
            flags,
        })
        .collect();

        Ok(Self {
            data,
            user_data,
            header_offset,
            sector_size: 512 << sector_shift,
            hash_table,
            block_table,
        })
    }

    /// Content of the user data block preceding the archive, if any.
    pub fn user_data(&self) -> Option<&[u8]> {
        self.user_data.as_deref()
    }

    /// Reads a file by name. `None` when the archive does not hold it.
    pub fn read_file(&self, name: &str) -> Result<Option<Vec<u8>>, MpqError> {
        let Some(block) = self.find(name) else {
            return Ok(None);
        };
        if block.flags & flags::EXISTS == 0 {
            return Ok(None);
        }
        if block.flags & (flags::ENCRYPTED | flags::IMPLODE) != 0 {
            return Err(MpqError::UnsupportedFlags(block.flags));
        }
        let size = block.size as usize;
        if size == 0 {
            return Ok(Some(Vec::new()));
        }

        let start = self.header_offset + block.offset as usize;
        let raw = start
            .checked_add(block.archived_size as usize)
            .and_then(|end| self.data.get(start..end))
            .ok_or(MpqError::Truncated)?;

        if block.flags & flags::SINGLE_UNIT != 0 {
            if block.flags & flags::COMPRESS != 0 && size > raw.len() {
                return decompress(raw).map(Some);
            }
            return Ok(Some(raw.to_vec()));
        }
        self.read_sectors(raw, block).map(Some)
    }

    fn find(&self, name: &str) -> Option<&BlockEntry> {
        let len = self.hash_table.len();
        if len == 0 {
            return None;
        }
        let hash_a = hash(name, HashType::HashA);
        let hash_b = hash(name, HashType::HashB);
        let start = hash(name, HashType::TableOffset) as usize % len;
        for i in 0..len {
            let entry = &self.hash_table[(start + i) % len];
            match entry.block_index {
                EMPTY => return None,
                DELETED => {}
                index if entry.hash_a == hash_a && entry.hash_b == hash_b => {
                    return self.block_table.get(index as usize);
                }
                _ => {}
            }
        }
        None
    }

    fn read_sectors(&self, raw: &[u8], block: &BlockEntry) -> Result<Vec<u8>, MpqError> {
        let size = block.size as usize;
        let sectors = size.div_ceil(self.sector_size);
        let mut cursor = Cursor::new(raw);
        let positions = (0..=sectors)
            .map(|_| cursor.read_u32::<LittleEndian>().map(|p| p as usize))
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = Vec::with_capacity(size);
        for pair in positions.windows(2) {
            let sector = raw.get(pair[0]..pair[1]).ok_or(MpqError::Truncated)?;
            let expected = size.saturating_sub(out.len()).min(self.sector_size);
            if block.flags & flags::COMPRESS != 0 && sector.len() < expected {
                out.extend(decompress(sector)?);
            } else {
                out.extend_from_slice(sector);
            }
        }
        Ok(out)
    }
}

fn read_table(
    data: &[u8],
    offset: usize,
    entries: usize,
    key: &str,
) -> Result<Vec<[u32; 4]>, MpqError> {
    let raw = entries
        .checked_mul(16)
        .and_then(|len| offset.checked_add(len))
        .and_then(|end| data.get(offset..end))
        .ok_or(MpqError::Truncated)?;
    let words = decrypt(raw, hash(key, HashType::Table));
    Ok(words
        .chunks_exact(4)
        .map(|w| [w[0], w[1], w[2], w[3]])
        .collect())
}

fn decompress(data: &[u8]) -> Result<Vec<u8>, MpqError> {
    let (&kind, body) = data.split_first().ok_or(MpqError::Truncated)?;
    let mut out = Vec::new();
    let read = match kind {
        compression::ZLIB => ZlibDecoder::new(body).read_to_end(&mut out),
        compression::BZIP2 => BzDecoder::new(body).read_to_end(&mut out),
        other => return Err(MpqError::UnsupportedCompression(other)),
    };
    read.map_err(MpqError::Decompress)?;
    Ok(out)
}

fn crypt_table() -> &'static [u32; 0x500] {
    static TABLE: OnceLock<[u32; 0x500]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0u32; 0x500];
        let mut seed: u32 = 0x0010_0001;
        for i in 0..0x100 {
            let mut index = i;
            for _ in 0..5 {
                seed = (seed * 125 + 3) % 0x2A_AAAB;
                let high = (seed & 0xFFFF) << 16;
                seed = (seed * 125 + 3) % 0x2A_AAAB;
                table[index] = high | (seed & 0xFFFF);
                index += 0x100;
            }
        }
        table
    })
}

fn hash(name: &str, kind: HashType) -> u32 {
    let table = crypt_table();
    let mut seed1: u32 = 0x7FED_7FED;
    let mut seed2: u32 = 0xEEEE_EEEE;
    for ch in name.bytes().map(|b| b.to_ascii_uppercase()) {
        let value = table[((kind as usize) << 8) + ch as usize];
        seed1 = value ^ seed1.wrapping_add(seed2);
        seed2 = u32::from(ch)
            .wrapping_add(seed1)
            .wrapping_add(seed2)
            .wrapping_add(seed2 << 5)
            .wrapping_add(3);
    }
    seed1
}

fn decrypt(data: &[u8], mut key: u32) -> Vec<u32> {
    let table = crypt_table();
    let mut seed: u32 = 0xEEEE_EEEE;
    data.chunks_exact(4)
        .map(|chunk| {
            seed = seed.wrapping_add(table[0x400 + (key & 0xFF) as usize]);
            let value = LittleEndian::read_u32(chunk) ^ key.wrapping_add(seed);
            key = (!key << 0x15).wrapping_add(0x1111_1111) | (key >> 0x0B);
            seed = value
                .wrapping_add(seed)
                .wrapping_add(seed << 5)
                .wrapping_add(3);
            value
        })
        .collect()
}

/// Builds small archives the way replay writers lay them out.
#[cfg(test)]
pub(crate) mod testing {
    use std::io::Write;

    use super::*;

    pub(crate) enum Stored {
        Plain,
        Zlib,
        Bzip2Sectors,
        Encrypted,
    }

    const SECTOR_SHIFT: u16 = 0;
    const SECTOR_SIZE: usize = 512;
    const HEADER_LEN: usize = 32;

    fn encrypt(words: &[u32], mut key: u32) -> Vec<u8> {
        let table = crypt_table();
        let mut seed: u32 = 0xEEEE_EEEE;
        let mut out = Vec::with_capacity(words.len() * 4);
        for &value in words {
            seed = seed.wrapping_add(table[0x400 + (key & 0xFF) as usize]);
            out.extend_from_slice(&(value ^ key.wrapping_add(seed)).to_le_bytes());
            key = (!key << 0x15).wrapping_add(0x1111_1111) | (key >> 0x0B);
            seed = value
                .wrapping_add(seed)
                .wrapping_add(seed << 5)
                .wrapping_add(3);
        }
        out
    }

    fn zlib(content: &[u8]) -> Vec<u8> {
        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(content).unwrap();
        let mut out = vec![compression::ZLIB];
        out.extend(encoder.finish().unwrap());
        out
    }

    fn bzip2(content: &[u8]) -> Vec<u8> {
        let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        encoder.write_all(content).unwrap();
        let mut out = vec![compression::BZIP2];
        out.extend(encoder.finish().unwrap());
        out
    }

    fn sectors(content: &[u8]) -> Vec<u8> {
        let chunks: Vec<Vec<u8>> = content
            .chunks(SECTOR_SIZE)
            .map(|chunk| {
                let packed = bzip2(chunk);
                if packed.len() < chunk.len() {
                    packed
                } else {
                    chunk.to_vec()
                }
            })
            .collect();
        let mut position = (chunks.len() + 1) * 4;
        let mut out = (position as u32).to_le_bytes().to_vec();
        for chunk in &chunks {
            position += chunk.len();
            out.extend_from_slice(&(position as u32).to_le_bytes());
        }
        for chunk in chunks {
            out.extend(chunk);
        }
        out
    }

    pub(crate) fn build_archive(user_data: &[u8], files: &[(&str, &[u8], Stored)]) -> Vec<u8> {
        let mut body = Vec::new();
        let mut blocks = Vec::new();
        for (_, content, stored) in files {
            let (bytes, file_flags) = match stored {
                Stored::Plain => (content.to_vec(), flags::EXISTS | flags::SINGLE_UNIT),
                Stored::Zlib => (
                    zlib(content),
                    flags::EXISTS | flags::SINGLE_UNIT | flags::COMPRESS,
                ),
                Stored::Bzip2Sectors => (sectors(content), flags::EXISTS | flags::COMPRESS),
                Stored::Encrypted => (
                    content.to_vec(),
                    flags::EXISTS | flags::SINGLE_UNIT | flags::ENCRYPTED,
                ),
            };
            blocks.extend([
                (HEADER_LEN + body.len()) as u32,
                bytes.len() as u32,
                content.len() as u32,
                file_flags,
            ]);
            body.extend(bytes);
        }

        let slots = (files.len() * 2).max(4).next_power_of_two();
        let mut hashes = vec![[EMPTY, EMPTY, EMPTY, EMPTY]; slots];
        for (index, (name, _, _)) in files.iter().enumerate() {
            let mut slot = hash(name, HashType::TableOffset) as usize % slots;
            while hashes[slot][3] != EMPTY {
                slot = (slot + 1) % slots;
            }
            hashes[slot] = [
                hash(name, HashType::HashA),
                hash(name, HashType::HashB),
                0,
                index as u32,
            ];
        }
        let hash_words: Vec<u32> = hashes.concat();

        let hash_table_offset = HEADER_LEN + body.len();
        let block_table_offset = hash_table_offset + slots * 16;
        let archive_size = block_table_offset + blocks.len() * 4;
        let header_offset = (16 + user_data.len()).next_multiple_of(16);

        let mut out = USER_DATA_MAGIC.to_vec();
        out.extend_from_slice(&(header_offset as u32).to_le_bytes());
        out.extend_from_slice(&(header_offset as u32).to_le_bytes());
        out.extend_from_slice(&(user_data.len() as u32).to_le_bytes());
        out.extend_from_slice(user_data);
        out.resize(header_offset, 0);

        out.extend_from_slice(HEADER_MAGIC);
        out.extend_from_slice(&(HEADER_LEN as u32).to_le_bytes());
        out.extend_from_slice(&(archive_size as u32).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&SECTOR_SHIFT.to_le_bytes());
        out.extend_from_slice(&(hash_table_offset as u32).to_le_bytes());
        out.extend_from_slice(&(block_table_offset as u32).to_le_bytes());
        out.extend_from_slice(&(slots as u32).to_le_bytes());
        out.extend_from_slice(&(files.len() as u32).to_le_bytes());
        out.extend(body);
        out.extend(encrypt(&hash_words, hash("(hash table)", HashType::Table)));
        out.extend(encrypt(&blocks, hash("(block table)", HashType::Table)));
        out
    }
}
