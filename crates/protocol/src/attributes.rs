//! Attributes events blob.
//!
//! The layout is the same for every build, little endian:
//!
//! ```text
//! source u8 | mapNamespace u32 | count u32 | { namespace u32 | attrid u32 | scope u8 | value [u8; 4] }*
//! ```
//!
//! Values are stored reversed and NUL padded.

use hots_lambda_buffers::BitReader;
use hots_lambda_value::Node;
use indexmap::IndexMap;

use crate::DecodeError;

/// Decodes an attributes blob into
/// `{source, mapNamespace, scopes: {scope: {attrid: [{namespace, attrid, value}]}}}`.
///
/// An empty blob decodes to an empty object.
pub fn decode_attributes_events(contents: &[u8]) -> Result<Node, DecodeError> {
    let mut buffer = BitReader::little(contents);
    if buffer.done() {
        return Ok(Node::object());
    }

    let source = buffer.read_bits(8)?;
    let map_namespace = buffer.read_bits(32)?;
    // entry count, the blob is read to its end instead
    buffer.read_bits(32)?;

    let mut scopes: IndexMap<u64, IndexMap<u64, Vec<Node>>> = IndexMap::new();
    while !buffer.done() {
        let namespace = buffer.read_bits(32)?;
        let attrid = buffer.read_bits(32)?;
        let scope = buffer.read_bits(8)?;
        let value = attribute_value(buffer.read_aligned_bytes(4)?);
        let entry = Node::Object(vec![
            ("namespace".into(), Node::from(namespace)),
            ("attrid".into(), Node::from(attrid)),
            ("value".into(), value),
        ]);
        scopes
            .entry(scope)
            .or_default()
            .entry(attrid)
            .or_default()
            .push(entry);
    }

    let scopes = scopes
        .into_iter()
        .map(|(scope, attrs)| {
            let attrs = attrs
                .into_iter()
                .map(|(attrid, values)| (attrid.to_string(), Node::Array(values)))
                .collect();
            (scope.to_string(), Node::Object(attrs))
        })
        .collect();

    Ok(Node::Object(vec![
        ("source".into(), Node::from(source)),
        ("mapNamespace".into(), Node::from(map_namespace)),
        ("scopes".into(), Node::Object(scopes)),
    ]))
}

fn attribute_value(raw: &[u8]) -> Node {
    let reversed: Vec<u8> = raw.iter().rev().copied().collect();
    let start = reversed.iter().position(|b| *b != 0).unwrap_or(reversed.len());
    let end = reversed.iter().rposition(|b| *b != 0).map_or(start, |i| i + 1);
    Node::text_or_bytes(reversed[start..end].to_vec())
}
