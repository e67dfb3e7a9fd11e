//! Field names decoders attach to every event of an event stream.

/// Event kind name, e.g. `NNet.Game.SCameraUpdateEvent`.
pub const EVENT: &str = "_event";
/// Numeric event id the kind was looked up by.
pub const EVENT_ID: &str = "_eventid";
/// Cumulative game loop the event fired on.
pub const GAMELOOP: &str = "_gameloop";
/// Decoded user id struct, absent on tracker events.
pub const USER_ID: &str = "_userid";
/// Bits consumed decoding the event, including alignment padding.
pub const BITS: &str = "_bits";
