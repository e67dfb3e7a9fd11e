//! Versioned decoder.
//!
//! Every value is prefixed by a one-byte skip marker naming its wire shape,
//! so readers can step over struct members and choice alternatives they do
//! not know. Integers are written as `vint`: the low bit of the first byte
//! is the sign, the remaining bits form the magnitude in 7-bit groups with
//! `0x80` as the continuation flag.

use hots_lambda_buffers::BitReader;
use hots_lambda_value::Node;

use crate::decoder::{apply_field, checked_len, Depth, InstanceDecoder};
use crate::typeinfo::TypeInfo;
use crate::DecodeError;

mod marker {
    pub const ARRAY: u8 = 0;
    pub const BIT_ARRAY: u8 = 1;
    pub const BLOB: u8 = 2;
    pub const CHOICE: u8 = 3;
    pub const OPTIONAL: u8 = 4;
    pub const STRUCT: u8 = 5;
    pub const U8: u8 = 6;
    pub const U32: u8 = 7;
    pub const U64: u8 = 8;
    pub const VINT: u8 = 9;
}

pub struct VersionedDecoder<'a> {
    buffer: BitReader<'a>,
    typeinfos: &'a [TypeInfo],
    depth: Depth,
}

impl<'a> VersionedDecoder<'a> {
    pub fn new(contents: &'a [u8], typeinfos: &'a [TypeInfo]) -> Self {
        Self {
            buffer: BitReader::big(contents),
            typeinfos,
            depth: Depth::default(),
        }
    }

    fn byte(&mut self) -> Result<u8, DecodeError> {
        Ok(self.buffer.read_bits(8)? as u8)
    }

    fn expect_skip(&mut self, expected: u8) -> Result<(), DecodeError> {
        let found = self.byte()?;
        if found != expected {
            return Err(DecodeError::UnexpectedMarker { expected, found });
        }
        Ok(())
    }

    fn vint(&mut self) -> Result<i128, DecodeError> {
        let mut b = self.byte()?;
        let negative = b & 1 != 0;
        let mut result = u128::from((b >> 1) & 0x3f);
        let mut shift = 6u32;
        while b & 0x80 != 0 {
            if shift >= 64 {
                return Err(DecodeError::VarintOverflow);
            }
            b = self.byte()?;
            result |= u128::from(b & 0x7f) << shift;
            shift += 7;
        }
        if result > u128::from(u64::MAX) {
            return Err(DecodeError::VarintOverflow);
        }
        let value = result as i128;
        Ok(if negative { -value } else { value })
    }

    fn length(&mut self) -> Result<usize, DecodeError> {
        let value = self.vint()?;
        checked_len(value)
    }

    fn aligned(&mut self, count: usize) -> Result<&'a [u8], DecodeError> {
        Ok(self.buffer.read_aligned_bytes(count)?)
    }

    /// Steps over one value of any shape.
    fn skip_instance(&mut self) -> Result<(), DecodeError> {
        self.depth.enter()?;
        let result = self.skip_marked();
        self.depth.leave();
        result
    }

    fn skip_marked(&mut self) -> Result<(), DecodeError> {
        match self.byte()? {
            marker::ARRAY => {
                for _ in 0..self.length()? {
                    self.skip_instance()?;
                }
            }
            marker::BIT_ARRAY => {
                let length = self.length()?;
                self.aligned(length.div_ceil(8))?;
            }
            marker::BLOB => {
                let length = self.length()?;
                self.aligned(length)?;
            }
            marker::CHOICE => {
                self.vint()?;
                self.skip_instance()?;
            }
            marker::OPTIONAL => {
                if self.byte()? != 0 {
                    self.skip_instance()?;
                }
            }
            marker::STRUCT => {
                for _ in 0..self.length()? {
                    self.vint()?;
                    self.skip_instance()?;
                }
            }
            marker::U8 => {
                self.aligned(1)?;
            }
            marker::U32 => {
                self.aligned(4)?;
            }
            marker::U64 => {
                self.aligned(8)?;
            }
            marker::VINT => {
                self.vint()?;
            }
            other => return Err(DecodeError::UnknownMarker(other)),
        }
        Ok(())
    }

    fn decode(&mut self, info: &'a TypeInfo) -> Result<Node, DecodeError> {
        match info {
            TypeInfo::Int { .. } => {
                self.expect_skip(marker::VINT)?;
                Ok(Node::int(self.vint()?))
            }
            TypeInfo::Bool => {
                self.expect_skip(marker::U8)?;
                Ok(Node::Bool(self.byte()? != 0))
            }
            TypeInfo::Blob { .. } => {
                self.expect_skip(marker::BLOB)?;
                let length = self.length()?;
                Ok(Node::Bytes(self.aligned(length)?.to_vec()))
            }
            TypeInfo::BitArray { .. } => {
                self.expect_skip(marker::BIT_ARRAY)?;
                let length = self.length()?;
                let bits = self.aligned(length.div_ceil(8))?.to_vec();
                Ok(Node::Array(vec![Node::from(length as u64), Node::Bytes(bits)]))
            }
            TypeInfo::Array { typeid, .. } => {
                self.expect_skip(marker::ARRAY)?;
                let length = self.length()?;
                let mut items = Vec::with_capacity(length.min(1024));
                for _ in 0..length {
                    items.push(self.instance(*typeid)?);
                }
                Ok(Node::Array(items))
            }
            TypeInfo::Choice { fields, .. } => {
                self.expect_skip(marker::CHOICE)?;
                let tag = self.vint()?;
                match fields.iter().find(|f| i128::from(f.tag()) == tag) {
                    Some(field) => {
                        let value = self.instance(field.typeid())?;
                        Ok(Node::Object(vec![(field.name().to_owned(), value)]))
                    }
                    None => {
                        self.skip_instance()?;
                        Ok(Node::object())
                    }
                }
            }
            TypeInfo::Optional { typeid } => {
                self.expect_skip(marker::OPTIONAL)?;
                if self.byte()? != 0 {
                    self.instance(*typeid)
                } else {
                    Ok(Node::Null)
                }
            }
            TypeInfo::Struct { fields } => {
                self.expect_skip(marker::STRUCT)?;
                let mut result = Node::object();
                for _ in 0..self.length()? {
                    let tag = self.vint()?;
                    match fields.iter().find(|f| i128::from(f.tag()) == tag) {
                        Some(field) => {
                            let value = self.instance(field.typeid())?;
                            apply_field(&mut result, field.name(), value, fields.len());
                        }
                        None => self.skip_instance()?,
                    }
                }
                Ok(result)
            }
            TypeInfo::FourCC => {
                self.expect_skip(marker::U32)?;
                Ok(Node::Bytes(self.aligned(4)?.to_vec()))
            }
            TypeInfo::Real32 => {
                self.expect_skip(marker::U32)?;
                let bytes = self.aligned(4)?;
                let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
                Ok(Node::Float(f64::from(f32::from_be_bytes(raw))))
            }
            TypeInfo::Real64 => {
                self.expect_skip(marker::U64)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(self.aligned(8)?);
                Ok(Node::Float(f64::from_be_bytes(raw)))
            }
            TypeInfo::Null => Ok(Node::Null),
        }
    }
}

impl InstanceDecoder for VersionedDecoder<'_> {
    fn instance(&mut self, typeid: usize) -> Result<Node, DecodeError> {
        let typeinfos = self.typeinfos;
        let info = typeinfos
            .get(typeid)
            .ok_or(DecodeError::UnknownTypeId(typeid))?;
        self.depth.enter()?;
        let result = self.decode(info);
        self.depth.leave();
        result
    }

    fn byte_align(&mut self) {
        self.buffer.byte_align();
    }

    fn done(&self) -> bool {
        self.buffer.done()
    }

    fn used_bits(&self) -> u64 {
        self.buffer.used_bits()
    }
}
