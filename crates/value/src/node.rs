//! The decoded replay value type.

/// A nested, heterogeneous value produced by a replay decoder.
///
/// Objects keep their fields in decode order. Numeric variants compare by
/// value, so `Int(5) == UInt(5)`.
#[derive(Debug, Clone)]
pub enum Node {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Array(Vec<Node>),
    Object(Vec<(String, Node)>),
}

impl Node {
    /// An empty object.
    pub fn object() -> Self {
        Node::Object(Vec::new())
    }

    /// Builds an integer node, picking `UInt` only when the value does not
    /// fit in an `i64`.
    pub fn int(value: i128) -> Self {
        if let Ok(v) = i64::try_from(value) {
            Node::Int(v)
        } else if let Ok(v) = u64::try_from(value) {
            Node::UInt(v)
        } else {
            Node::Float(value as f64)
        }
    }

    /// Builds a string node from raw bytes, keeping them as bytes when they
    /// are not valid UTF-8.
    pub fn text_or_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(s) => Node::Str(s),
            Err(err) => Node::Bytes(err.into_bytes()),
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Node::Object(_))
    }

    /// Looks up a field of an object. Returns `None` for non-objects.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Object(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Follows a path of object keys.
    pub fn pointer(&self, path: &[&str]) -> Option<&Node> {
        path.iter().try_fold(self, |node, key| node.get(key))
    }

    /// Sets a field on an object, replacing an existing value in place.
    ///
    /// Returns the previous value. Non-object nodes are left untouched.
    pub fn insert(&mut self, key: impl Into<String>, value: Node) -> Option<Node> {
        let Node::Object(fields) = self else {
            return None;
        };
        let key = key.into();
        match fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                fields.push((key, value));
                None
            }
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Non-negative integer view of the node.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Node::Int(v) => u64::try_from(*v).ok(),
            Node::UInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Node::Int(v) => Some(*v),
            Node::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Node::Null, Node::Null) => true,
            (Node::Bool(a), Node::Bool(b)) => a == b,
            (Node::Int(a), Node::Int(b)) => a == b,
            (Node::UInt(a), Node::UInt(b)) => a == b,
            (Node::Int(a), Node::UInt(b)) | (Node::UInt(b), Node::Int(a)) => {
                u64::try_from(*a).is_ok_and(|a| a == *b)
            }
            (Node::Float(a), Node::Float(b)) => a == b,
            (Node::Str(a), Node::Str(b)) => a == b,
            (Node::Bytes(a), Node::Bytes(b)) => a == b,
            (Node::Array(a), Node::Array(b)) => a == b,
            (Node::Object(a), Node::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Bool(value)
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Int(value)
    }
}

impl From<u64> for Node {
    fn from(value: u64) -> Self {
        Node::int(i128::from(value))
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Str(value.to_owned())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::Str(value)
    }
}

impl From<Vec<Node>> for Node {
    fn from(value: Vec<Node>) -> Self {
        Node::Array(value)
    }
}

impl From<serde_json::Value> for Node {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Node::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Node::UInt(u)
                } else {
                    Node::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Node::Str(s),
            Value::Array(items) => Node::Array(items.into_iter().map(Node::from).collect()),
            Value::Object(map) => {
                Node::Object(map.into_iter().map(|(k, v)| (k, Node::from(v))).collect())
            }
        }
    }
}
