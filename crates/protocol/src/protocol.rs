use hots_lambda_value::Node;

use crate::attributes;
use crate::{DecodeError, ProtocolError};

/// Capability name reported when a build has no tracker events.
pub const TRACKER_EVENTS: &str = "tracker events";

/// Lazily decoded events, fused after the first error.
pub type EventStream<'a> = Box<dyn Iterator<Item = Result<Node, DecodeError>> + 'a>;

/// Decoders for one protocol build.
///
/// Tracker events only exist from a certain build onward, so they are an
/// optional capability: implementations that have them override both
/// [`Protocol::supports_tracker_events`] and
/// [`Protocol::decode_tracker_events`].
pub trait Protocol: Send + Sync {
    /// Base build this protocol decodes.
    fn base_build(&self) -> u32;

    fn decode_header(&self, contents: &[u8]) -> Result<Node, DecodeError>;

    fn decode_details(&self, contents: &[u8]) -> Result<Node, DecodeError>;

    fn decode_init_data(&self, contents: &[u8]) -> Result<Node, DecodeError>;

    fn decode_game_events<'a>(&'a self, contents: &'a [u8]) -> EventStream<'a>;

    fn decode_message_events<'a>(&'a self, contents: &'a [u8]) -> EventStream<'a>;

    fn decode_attributes_events(&self, contents: &[u8]) -> Result<Node, DecodeError> {
        attributes::decode_attributes_events(contents)
    }

    fn supports_tracker_events(&self) -> bool {
        false
    }

    /// Fails with [`ProtocolError::MissingOptionalCapability`] when the build
    /// has no tracker events.
    fn decode_tracker_events<'a>(
        &'a self,
        _contents: &'a [u8],
    ) -> Result<EventStream<'a>, ProtocolError> {
        Err(ProtocolError::MissingOptionalCapability {
            build: self.base_build(),
            capability: TRACKER_EVENTS,
        })
    }
}
