//! Collapsing a nested record into compound-key fields.
//!
//! Every object is descended into and its keys are joined onto the parent
//! path with a separator. Arrays are only descended into when they hold
//! exactly one object (the "singleton wrapper" shape decoders emit for
//! attribute tables); every other array is kept whole as a terminal value.
//! An array of two objects therefore loses its structure in the output.
//!
//! Two different source paths can produce the same flat key (for example
//! `{"a_b": 1}` and `{"a": {"b": 2}}` under `_`). The later write wins and
//! keeps the position of the first.

use hots_lambda_value::Node;
use indexmap::IndexMap;

/// A single-level record: compound path key → terminal value.
pub type FlatRecord = IndexMap<String, Node>;

/// Separator placed between path segments unless configured otherwise.
pub const DEFAULT_SEPARATOR: &str = "_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenOptions {
    pub separator: String,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_owned(),
        }
    }
}

/// Flatten `node` with the default `_` separator.
pub fn flatten(node: Node) -> FlatRecord {
    flatten_with(node, &FlattenOptions::default())
}

/// Flatten `node` with explicit options.
///
/// A root that is not an object ends up under the empty key.
pub fn flatten_with(node: Node, options: &FlattenOptions) -> FlatRecord {
    let mut out = FlatRecord::new();
    flatten_into(&mut out, "", node, &options.separator);
    out
}

enum Shape {
    Mapping(Vec<(String, Node)>),
    Terminal(Node),
}

fn classify(node: Node) -> Shape {
    match node {
        Node::Object(fields) => Shape::Mapping(fields),
        Node::Array(items) => unwrap_singleton(items),
        other => Shape::Terminal(other),
    }
}

fn unwrap_singleton(mut items: Vec<Node>) -> Shape {
    if items.len() == 1 {
        match items.pop() {
            Some(Node::Object(fields)) => return Shape::Mapping(fields),
            Some(other) => items.push(other),
            None => {}
        }
    }
    Shape::Terminal(Node::Array(items))
}

fn flatten_into(out: &mut FlatRecord, prefix: &str, node: Node, separator: &str) {
    match classify(node) {
        Shape::Mapping(fields) => {
            for (key, value) in fields {
                let path = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}{separator}{key}")
                };
                flatten_into(out, &path, value, separator);
            }
        }
        Shape::Terminal(value) => {
            out.insert(prefix.to_owned(), value);
        }
    }
}
