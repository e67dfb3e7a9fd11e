//! Event stream decoding shared by game, message and tracker streams.

use std::collections::BTreeMap;

use hots_lambda_value::{annotation, Node};

use crate::decoder::InstanceDecoder;
use crate::DecodeError;

/// Struct type and display name of one event id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventType {
    pub typeid: usize,
    pub name: String,
}

/// Typeids an event stream is framed with.
#[derive(Debug, Clone, Copy)]
pub struct EventStreamLayout<'a> {
    pub eventid_typeid: usize,
    pub event_types: &'a BTreeMap<i64, EventType>,
    pub svaruint32_typeid: usize,
    /// Present for streams that tag each event with its user.
    pub userid_typeid: Option<usize>,
}

/// Lazily decodes events until the input is exhausted.
///
/// Yields at most one error, after which the iterator is exhausted.
pub struct EventIter<'a, D> {
    decoder: D,
    layout: EventStreamLayout<'a>,
    gameloop: i128,
    failed: bool,
}

impl<'a, D: InstanceDecoder> EventIter<'a, D> {
    pub fn new(decoder: D, layout: EventStreamLayout<'a>) -> Self {
        Self {
            decoder,
            layout,
            gameloop: 0,
            failed: false,
        }
    }

    fn next_event(&mut self) -> Result<Node, DecodeError> {
        let start = self.decoder.used_bits();

        let delta = self.decoder.instance(self.layout.svaruint32_typeid)?;
        self.gameloop += varuint_value(&delta);

        let userid = match self.layout.userid_typeid {
            Some(typeid) => Some(self.decoder.instance(typeid)?),
            None => None,
        };

        let eventid = self
            .decoder
            .instance(self.layout.eventid_typeid)?
            .as_i64()
            .ok_or(DecodeError::InvalidEventId)?;
        let event_type = self
            .layout
            .event_types
            .get(&eventid)
            .ok_or(DecodeError::UnknownEventId(eventid))?;

        let mut event = self.decoder.instance(event_type.typeid)?;
        if !event.is_object() {
            return Err(DecodeError::EventNotStruct(event_type.name.clone()));
        }
        event.insert(annotation::EVENT, Node::from(event_type.name.as_str()));
        event.insert(annotation::EVENT_ID, Node::Int(eventid));
        event.insert(annotation::GAMELOOP, Node::int(self.gameloop));
        if let Some(userid) = userid {
            event.insert(annotation::USER_ID, userid);
        }

        self.decoder.byte_align();
        let bits = self.decoder.used_bits() - start;
        event.insert(annotation::BITS, Node::from(bits));
        Ok(event)
    }
}

impl<D: InstanceDecoder> Iterator for EventIter<'_, D> {
    type Item = Result<Node, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.decoder.done() {
            return None;
        }
        let event = self.next_event();
        self.failed = event.is_err();
        Some(event)
    }
}

/// Integer carried by a variable-width choice such as `{"m_uint14": 300}`.
fn varuint_value(value: &Node) -> i128 {
    match value {
        Node::Object(fields) => fields
            .first()
            .and_then(|(_, v)| v.as_i64())
            .map_or(0, i128::from),
        other => other.as_i64().map_or(0, i128::from),
    }
}
