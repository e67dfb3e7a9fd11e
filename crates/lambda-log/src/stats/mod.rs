//! Per event kind occurrence and size accounting.
//!
//! Only events that carry both an `_event` name and a `_bits` size are
//! counted; header, details and init data records carry neither.

use std::fmt;
use std::io::{self, Write};

use hots_lambda_value::{annotation, Node};
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventStat {
    pub count: u64,
    pub bits: u64,
}

/// One line of the summary: kind, occurrences and whole bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatRow {
    pub kind: String,
    pub count: u64,
    pub bytes: u64,
}

impl fmt::Display for StatRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\", {}, {},", self.kind, self.count, self.bytes)
    }
}

/// Stats table for a single decode session.
#[derive(Debug, Clone, Default)]
pub struct EventStats {
    table: IndexMap<String, EventStat>,
}

impl EventStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one decoded event. Returns `false` when the event lacks
    /// a kind or a bit length and was ignored.
    pub fn record(&mut self, event: &Node) -> bool {
        let kind = event.get(annotation::EVENT).and_then(Node::as_str);
        let bits = event.get(annotation::BITS).and_then(Node::as_u64);
        let (Some(kind), Some(bits)) = (kind, bits) else {
            return false;
        };
        let stat = self.table.entry(kind.to_owned()).or_default();
        stat.count += 1;
        stat.bits = stat.bits.saturating_add(bits);
        true
    }

    pub fn get(&self, kind: &str) -> Option<EventStat> {
        self.table.get(kind).copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Rows sorted by cumulative bits, smallest first. Ties keep the order
    /// in which kinds were first seen.
    pub fn summarize(&self) -> Vec<StatRow> {
        let mut entries: Vec<_> = self.table.iter().collect();
        entries.sort_by_key(|(_, stat)| stat.bits);
        entries
            .into_iter()
            .map(|(kind, stat)| StatRow {
                kind: kind.clone(),
                count: stat.count,
                bytes: stat.bits / 8,
            })
            .collect()
    }

    /// Write one summary row per line.
    pub fn write_summary<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        for row in self.summarize() {
            writeln!(out, "{row}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(kind: &str, bits: u64) -> Node {
        Node::from(json!({"_event": kind, "_eventid": 1, "_bits": bits}))
    }

    #[test]
    fn aggregates_and_orders_by_bits() {
        let mut stats = EventStats::new();
        assert!(stats.record(&event("Move", 16)));
        assert!(stats.record(&event("Chat", 800)));
        assert!(stats.record(&event("Move", 24)));

        assert_eq!(
            stats.summarize(),
            vec![
                StatRow {
                    kind: "Move".into(),
                    count: 2,
                    bytes: 5
                },
                StatRow {
                    kind: "Chat".into(),
                    count: 1,
                    bytes: 100
                },
            ]
        );
    }

    #[test]
    fn ignores_events_without_annotations() {
        let mut stats = EventStats::new();
        assert!(!stats.record(&Node::from(json!({"_event": "X"}))));
        assert!(!stats.record(&Node::from(json!({"_bits": 8}))));
        assert!(!stats.record(&Node::from(json!({"m_playerList": []}))));
        assert!(!stats.record(&Node::Int(1)));
        assert!(stats.is_empty());
    }

    #[test]
    fn byte_equivalent_truncates() {
        let mut stats = EventStats::new();
        stats.record(&event("Odd", 15));
        assert_eq!(stats.summarize()[0].bytes, 1);
        assert_eq!(stats.get("Odd"), Some(EventStat { count: 1, bits: 15 }));
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let mut stats = EventStats::new();
        stats.record(&event("B", 8));
        stats.record(&event("A", 8));
        let kinds: Vec<_> = stats.summarize().into_iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec!["B", "A"]);
    }

    #[test]
    fn summary_lines_are_csv_like() {
        let mut stats = EventStats::new();
        stats.record(&event("NNet.Game.SCameraUpdateEvent", 80));
        let mut out: Vec<u8> = Vec::new();
        stats.write_summary(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\"NNet.Game.SCameraUpdateEvent\", 1, 10,\n"
        );
    }
}
