//! Bit-packed decoder.
//!
//! Used for game events, message events and init data. Values carry no
//! framing: integers occupy exactly their bound's bit width, struct members
//! follow declaration order and only blobs are byte aligned.

use hots_lambda_buffers::BitReader;
use hots_lambda_value::Node;

use crate::decoder::{apply_field, checked_len, Depth, InstanceDecoder};
use crate::typeinfo::{Bounds, TypeInfo};
use crate::DecodeError;

pub struct BitPackedDecoder<'a> {
    buffer: BitReader<'a>,
    typeinfos: &'a [TypeInfo],
    depth: Depth,
}

impl<'a> BitPackedDecoder<'a> {
    pub fn new(contents: &'a [u8], typeinfos: &'a [TypeInfo]) -> Self {
        Self {
            buffer: BitReader::big(contents),
            typeinfos,
            depth: Depth::default(),
        }
    }

    fn int(&mut self, bounds: Bounds) -> Result<i128, DecodeError> {
        let Bounds(offset, bits) = bounds;
        Ok(i128::from(offset) + i128::from(self.buffer.read_bits(bits)?))
    }

    fn flag(&mut self) -> Result<bool, DecodeError> {
        Ok(self.int(Bounds(0, 1))? != 0)
    }

    /// Reads an arbitrary-width bit field. Fields up to 64 bits become an
    /// integer, wider ones big-endian bytes.
    fn wide_bits(&mut self, length: usize) -> Result<Node, DecodeError> {
        if length <= 64 {
            return Ok(Node::from(self.buffer.read_bits(length as u32)?));
        }
        let mut bytes = Vec::with_capacity(length.div_ceil(8));
        let head = (length % 8) as u32;
        if head > 0 {
            bytes.push(self.buffer.read_bits(head)? as u8);
        }
        for _ in 0..length / 8 {
            bytes.push(self.buffer.read_bits(8)? as u8);
        }
        Ok(Node::Bytes(bytes))
    }

    fn decode(&mut self, info: &'a TypeInfo) -> Result<Node, DecodeError> {
        match info {
            TypeInfo::Int { bounds } => Ok(Node::int(self.int(*bounds)?)),
            TypeInfo::Bool => Ok(Node::Bool(self.flag()?)),
            TypeInfo::Blob { bounds } => {
                let length = checked_len(self.int(*bounds)?)?;
                Ok(Node::Bytes(self.buffer.read_aligned_bytes(length)?.to_vec()))
            }
            TypeInfo::BitArray { bounds } => {
                let length = checked_len(self.int(*bounds)?)?;
                let bits = self.wide_bits(length)?;
                Ok(Node::Array(vec![Node::from(length as u64), bits]))
            }
            TypeInfo::Array { bounds, typeid } => {
                let length = checked_len(self.int(*bounds)?)?;
                let mut items = Vec::with_capacity(length.min(1024));
                for _ in 0..length {
                    items.push(self.instance(*typeid)?);
                }
                Ok(Node::Array(items))
            }
            TypeInfo::Choice { bounds, fields } => {
                let tag = self.int(*bounds)?;
                let field = fields
                    .iter()
                    .find(|f| i128::from(f.tag()) == tag)
                    .ok_or(DecodeError::UnknownChoiceTag(tag))?;
                let value = self.instance(field.typeid())?;
                Ok(Node::Object(vec![(field.name().to_owned(), value)]))
            }
            TypeInfo::Optional { typeid } => {
                if self.flag()? {
                    self.instance(*typeid)
                } else {
                    Ok(Node::Null)
                }
            }
            TypeInfo::Struct { fields } => {
                let mut result = Node::object();
                for field in fields {
                    let value = self.instance(field.typeid())?;
                    apply_field(&mut result, field.name(), value, fields.len());
                }
                Ok(result)
            }
            TypeInfo::FourCC => Ok(Node::Bytes(self.buffer.read_unaligned_bytes(4)?)),
            TypeInfo::Real32 => {
                let bytes = self.buffer.read_unaligned_bytes(4)?;
                let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
                Ok(Node::Float(f64::from(f32::from_be_bytes(raw))))
            }
            TypeInfo::Real64 => {
                let bytes = self.buffer.read_unaligned_bytes(8)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&bytes);
                Ok(Node::Float(f64::from_be_bytes(raw)))
            }
            TypeInfo::Null => Ok(Node::Null),
        }
    }
}

impl InstanceDecoder for BitPackedDecoder<'_> {
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
