//! Protocol and decode error types.

use std::io;
use std::path::PathBuf;

use hots_lambda_buffers::BufferError;
use thiserror::Error;

/// A versioned decoder rejected its input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of input")]
    Truncated,
    #[error("cannot read {0} bits in a single field")]
    FieldTooWide(u32),
    #[error("typeid {0} is not defined")]
    UnknownTypeId(usize),
    #[error("expected skip marker {expected}, found {found}")]
    UnexpectedMarker { expected: u8, found: u8 },
    #[error("unknown skip marker {0}")]
    UnknownMarker(u8),
    #[error("choice tag {0} is not defined")]
    UnknownChoiceTag(i128),
    #[error("invalid length {0}")]
    InvalidLength(i128),
    #[error("variable-length integer overflows 64 bits")]
    VarintOverflow,
    #[error("event id did not decode to an integer")]
    InvalidEventId,
    #[error("event id {0} is not defined")]
    UnknownEventId(i64),
    #[error("event `{0}` did not decode to a struct")]
    EventNotStruct(String),
    #[error("value nesting exceeds {0} levels")]
    TooDeep(usize),
}

impl From<BufferError> for DecodeError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::EndOfBuffer => DecodeError::Truncated,
            BufferError::TooWide(bits) => DecodeError::FieldTooWide(bits),
        }
    }
}

/// Errors around protocol selection and protocol definitions.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unsupported base build {0}")]
    UnsupportedProtocolVersion(u32),
    #[error("protocol for build {build} has no {capability} decoder")]
    MissingOptionalCapability {
        build: u32,
        capability: &'static str,
    },
    #[error("no protocol registered for default build {0}")]
    MissingDefault(u32),
    #[error("failed to read protocol definitions at {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("protocol definition for build {build} is not valid JSON")]
    Parse {
        build: u32,
        #[source]
        source: serde_json::Error,
    },
    #[error("protocol definition for build {build} is inconsistent: {reason}")]
    InvalidSchema { build: u32, reason: String },
}
