use std::fmt;

/// A record category stored in a replay container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Header,
    Details,
    InitData,
    GameEvents,
    MessageEvents,
    TrackerEvents,
    AttributesEvents,
}

impl Category {
    /// Every category, in output order.
    pub const ALL: [Category; 7] = [
        Category::Header,
        Category::Details,
        Category::InitData,
        Category::GameEvents,
        Category::MessageEvents,
        Category::TrackerEvents,
        Category::AttributesEvents,
    ];

    /// Categories that decode to a stream of annotated events.
    pub const EVENT_STREAMS: [Category; 3] = [
        Category::GameEvents,
        Category::MessageEvents,
        Category::TrackerEvents,
    ];

    /// File name of the blob inside the replay archive.
    pub fn archive_name(self) -> &'static str {
        match self {
            Category::Header => "replay.header",
            Category::Details => "replay.details",
            Category::InitData => "replay.initData",
            Category::GameEvents => "replay.game.events",
            Category::MessageEvents => "replay.message.events",
            Category::TrackerEvents => "replay.tracker.events",
            Category::AttributesEvents => "replay.attributes.events",
        }
    }

    pub fn is_event_stream(self) -> bool {
        Self::EVENT_STREAMS.contains(&self)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Header => "header",
            Category::Details => "details",
            Category::InitData => "init data",
            Category::GameEvents => "game events",
            Category::MessageEvents => "message events",
            Category::TrackerEvents => "tracker events",
            Category::AttributesEvents => "attributes events",
        })
    }
}
