//! Behaviour shared by the bit-packed and versioned decoders.

use hots_lambda_value::Node;

use crate::typeinfo::PARENT_FIELD;
use crate::DecodeError;

/// Deepest value nesting a decoder follows before giving up.
pub const MAX_DEPTH: usize = 64;

/// A decoder that materializes typeids from a type-info table.
pub trait InstanceDecoder {
    /// Decode one value of type `typeid` at the cursor.
    fn instance(&mut self, typeid: usize) -> Result<Node, DecodeError>;
    fn byte_align(&mut self);
    fn done(&self) -> bool;
    fn used_bits(&self) -> u64;
}

/// Nesting guard for recursive decoding.
#[derive(Debug, Default)]
pub(crate) struct Depth(usize);

impl Depth {
    pub(crate) fn enter(&mut self) -> Result<(), DecodeError> {
        if self.0 >= MAX_DEPTH {
            return Err(DecodeError::TooDeep(MAX_DEPTH));
        }
        self.0 += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.0 = self.0.saturating_sub(1);
    }
}

/// Store a decoded struct member.
///
/// A `__parent` member that decoded to an object is merged into the struct.
/// When it is the only member and not an object, it replaces the struct.
pub(crate) fn apply_field(result: &mut Node, name: &str, value: Node, field_count: usize) {
    if name != PARENT_FIELD {
        result.insert(name, value);
        return;
    }
    match value {
        Node::Object(fields) => {
            for (key, value) in fields {
                result.insert(key, value);
            }
        }
        other if field_count == 1 => *result = other,
        other => {
            result.insert(name, other);
        }
    }
}

pub(crate) fn checked_len(value: i128) -> Result<usize, DecodeError> {
    usize::try_from(value).map_err(|_| DecodeError::InvalidLength(value))
}
