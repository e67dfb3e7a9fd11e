//! Replay protocol decoders.
//!
//! Each game build lays out its replay records differently. A [`Protocol`]
//! bundles the decoders for one build and a [`ProtocolRegistry`] picks the
//! protocol for a replay's base build, falling back to a default build when
//! the exact one is unknown.
//!
//! [`SchemaProtocol`] implements [`Protocol`] for any build described by a
//! type-info table, using the bit-packed and versioned decoding engines.

pub mod attributes;
pub mod bitpacked;
mod decoder;
mod error;
pub mod events;
mod protocol;
pub mod registry;
pub mod schema;
pub mod typeinfo;
pub mod versioned;

pub use attributes::decode_attributes_events;
pub use decoder::{InstanceDecoder, MAX_DEPTH};
pub use error::{DecodeError, ProtocolError};
pub use protocol::{EventStream, Protocol, TRACKER_EVENTS};
pub use registry::{ProtocolRegistry, Resolution, DEFAULT_BUILD};
pub use schema::{ProtocolSchema, SchemaProtocol};
