//! Protocols described by a JSON definition file.
//!
//! A definition lists the build's type-info table and the typeids that frame
//! each replay record:
//!
//! ```json
//! {
//!   "typeinfos": [{"type": "int", "bounds": [0, 7]}, ...],
//!   "game_eventid_typeid": 0,
//!   "game_event_types": [[5, 77, "NNet.Game.SPlayerLeaveEvent"]],
//!   "message_eventid_typeid": 1,
//!   "message_event_types": [[0, 80, "NNet.Game.SChatMessage"]],
//!   "tracker_eventid_typeid": 2,
//!   "tracker_event_types": [[1, 90, "NNet.Replay.Tracker.SUnitBornEvent"]],
//!   "svaruint32_typeid": 7,
//!   "replay_userid_typeid": 8,
//!   "replay_header_typeid": 13,
//!   "game_details_typeid": 40,
//!   "replay_initdata_typeid": 69
//! }
//! ```
//!
//! The tracker entries are optional; builds without them do not support
//! tracker events.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use hots_lambda_value::Node;
use serde::Deserialize;

use crate::bitpacked::BitPackedDecoder;
use crate::decoder::InstanceDecoder;
use crate::events::{EventIter, EventStreamLayout, EventType};
use crate::protocol::{EventStream, Protocol, TRACKER_EVENTS};
use crate::typeinfo::TypeInfo;
use crate::versioned::VersionedDecoder;
use crate::{DecodeError, ProtocolError};

/// Event table entry as `(eventid, typeid, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventTypeInfo(pub i64, pub usize, pub String);

#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolSchema {
    pub typeinfos: Vec<TypeInfo>,
    pub game_eventid_typeid: usize,
    pub game_event_types: Vec<EventTypeInfo>,
    pub message_eventid_typeid: usize,
    pub message_event_types: Vec<EventTypeInfo>,
    #[serde(default)]
    pub tracker_eventid_typeid: Option<usize>,
    #[serde(default)]
    pub tracker_event_types: Vec<EventTypeInfo>,
    pub svaruint32_typeid: usize,
    pub replay_userid_typeid: usize,
    pub replay_header_typeid: usize,
    pub game_details_typeid: usize,
    pub replay_initdata_typeid: usize,
}

/// A [`Protocol`] driven by a [`ProtocolSchema`].
#[derive(Debug)]
pub struct SchemaProtocol {
    build: u32,
    typeinfos: Vec<TypeInfo>,
    game_eventid_typeid: usize,
    game_event_types: BTreeMap<i64, EventType>,
    message_eventid_typeid: usize,
    message_event_types: BTreeMap<i64, EventType>,
    tracker_eventid_typeid: Option<usize>,
    tracker_event_types: BTreeMap<i64, EventType>,
    svaruint32_typeid: usize,
    replay_userid_typeid: usize,
    replay_header_typeid: usize,
    game_details_typeid: usize,
    replay_initdata_typeid: usize,
}

impl SchemaProtocol {
    /// Checks that every typeid the schema mentions exists.
    pub fn new(build: u32, schema: ProtocolSchema) -> Result<Self, ProtocolError> {
        let count = schema.typeinfos.len();
        let invalid = |reason: String| ProtocolError::InvalidSchema { build, reason };
        let check = |what: &str, typeid: usize| {
            if typeid < count {
                Ok(())
            } else {
                Err(invalid(format!(
                    "{what} refers to typeid {typeid}, table has {count} entries"
                )))
            }
        };

        for (index, info) in schema.typeinfos.iter().enumerate() {
            for child in info.children() {
                check(&format!("typeinfo {index}"), child)?;
            }
        }
        check("game_eventid_typeid", schema.game_eventid_typeid)?;
        check("message_eventid_typeid", schema.message_eventid_typeid)?;
        if let Some(typeid) = schema.tracker_eventid_typeid {
            check("tracker_eventid_typeid", typeid)?;
        }
        check("svaruint32_typeid", schema.svaruint32_typeid)?;
        check("replay_userid_typeid", schema.replay_userid_typeid)?;
        check("replay_header_typeid", schema.replay_header_typeid)?;
        check("game_details_typeid", schema.game_details_typeid)?;
        check("replay_initdata_typeid", schema.replay_initdata_typeid)?;

        let event_table =
            |entries: Vec<EventTypeInfo>| -> Result<BTreeMap<i64, EventType>, ProtocolError> {
                let mut table = BTreeMap::new();
                for EventTypeInfo(eventid, typeid, name) in entries {
                    check(&name, typeid)?;
                    if table.insert(eventid, EventType { typeid, name }).is_some() {
                        return Err(invalid(format!("event id {eventid} is listed twice")));
                    }
                }
                Ok(table)
            };
        let game_event_types = event_table(schema.game_event_types)?;
        let message_event_types = event_table(schema.message_event_types)?;
        let tracker_event_types = event_table(schema.tracker_event_types)?;

        Ok(Self {
            build,
            typeinfos: schema.typeinfos,
            game_eventid_typeid: schema.game_eventid_typeid,
            game_event_types,
            message_eventid_typeid: schema.message_eventid_typeid,
            message_event_types,
            tracker_eventid_typeid: schema.tracker_eventid_typeid,
            tracker_event_types,
            svaruint32_typeid: schema.svaruint32_typeid,
            replay_userid_typeid: schema.replay_userid_typeid,
            replay_header_typeid: schema.replay_header_typeid,
            game_details_typeid: schema.game_details_typeid,
            replay_initdata_typeid: schema.replay_initdata_typeid,
        })
    }

    pub fn from_json(build: u32, json: &str) -> Result<Self, ProtocolError> {
        let schema = serde_json::from_str(json)
            .map_err(|source| ProtocolError::Parse { build, source })?;
        Self::new(build, schema)
    }

    pub fn load(build: u32, path: &Path) -> Result<Self, ProtocolError> {
        let json = fs::read_to_string(path).map_err(|source| ProtocolError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(build, &json)
    }

    fn versioned<'a>(&'a self, contents: &'a [u8]) -> VersionedDecoder<'a> {
        VersionedDecoder::new(contents, &self.typeinfos)
    }

    fn bitpacked<'a>(&'a self, contents: &'a [u8]) -> BitPackedDecoder<'a> {
        BitPackedDecoder::new(contents, &self.typeinfos)
    }
}

impl Protocol for SchemaProtocol {
    fn base_build(&self) -> u32 {
        self.build
    }

    fn decode_header(&self, contents: &[u8]) -> Result<Node, DecodeError> {
        self.versioned(contents).instance(self.replay_header_typeid)
    }

    fn decode_details(&self, contents: &[u8]) -> Result<Node, DecodeError> {
        self.versioned(contents).instance(self.game_details_typeid)
    }

    fn decode_init_data(&self, contents: &[u8]) -> Result<Node, DecodeError> {
        self.bitpacked(contents).instance(self.replay_initdata_typeid)
    }

    fn decode_game_events<'a>(&'a self, contents: &'a [u8]) -> EventStream<'a> {
        let layout = EventStreamLayout {
            eventid_typeid: self.game_eventid_typeid,
            event_types: &self.game_event_types,
            svaruint32_typeid: self.svaruint32_typeid,
            userid_typeid: Some(self.replay_userid_typeid),
        };
        Box::new(EventIter::new(self.bitpacked(contents), layout))
    }

    fn decode_message_events<'a>(&'a self, contents: &'a [u8]) -> EventStream<'a> {
        let layout = EventStreamLayout {
            eventid_typeid: self.message_eventid_typeid,
            event_types: &self.message_event_types,
            svaruint32_typeid: self.svaruint32_typeid,
            userid_typeid: Some(self.replay_userid_typeid),
        };
        Box::new(EventIter::new(self.bitpacked(contents), layout))
    }

    fn supports_tracker_events(&self) -> bool {
        self.tracker_eventid_typeid.is_some()
    }

    fn decode_tracker_events<'a>(
        &'a self,
        contents: &'a [u8],
    ) -> Result<EventStream<'a>, ProtocolError> {
        let eventid_typeid = self.tracker_eventid_typeid.ok_or(
            ProtocolError::MissingOptionalCapability {
                build: self.build,
                capability: TRACKER_EVENTS,
            },
        )?;
        let layout = EventStreamLayout {
            eventid_typeid,
            event_types: &self.tracker_event_types,
            svaruint32_typeid: self.svaruint32_typeid,
            userid_typeid: None,
        };
        Ok(Box::new(EventIter::new(self.versioned(contents), layout)))
    }
}
