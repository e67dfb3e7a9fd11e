//! Text rendering of [`Node`] values for log lines.
//!
//! The rendering matches what the log consumers already parse: booleans are
//! `True`/`False`, null is `None`, and whole floats keep a trailing `.0`.
//! A node printed on its own renders strings and bytes bare. Inside an array
//! or object, strings are single quoted so element boundaries stay visible.

use std::fmt::{self, Write};

use crate::Node;

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Str(s) => f.write_str(s),
            Node::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            other => write_nested(f, other),
        }
    }
}

fn write_nested(f: &mut fmt::Formatter<'_>, node: &Node) -> fmt::Result {
    match node {
        Node::Null => f.write_str("None"),
        Node::Bool(true) => f.write_str("True"),
        Node::Bool(false) => f.write_str("False"),
        Node::Int(v) => write!(f, "{v}"),
        Node::UInt(v) => write!(f, "{v}"),
        Node::Float(v) => write_float(f, *v),
        Node::Str(s) => write_quoted(f, s),
        Node::Bytes(b) => write_quoted(f, &String::from_utf8_lossy(b)),
        Node::Array(items) => {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_nested(f, item)?;
            }
            f.write_str("]")
        }
        Node::Object(fields) => {
            f.write_str("{")?;
            for (i, (key, value)) in fields.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_quoted(f, key)?;
                f.write_str(": ")?;
                write_nested(f, value)?;
            }
            f.write_str("}")
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_nan() {
        f.write_str("nan")
    } else if v.is_infinite() {
        f.write_str(if v > 0.0 { "inf" } else { "-inf" })
    } else if v.fract() == 0.0 && v.abs() < 1e16 {
        write!(f, "{v:.1}")
    } else {
        write!(f, "{v}")
    }
}

/// Single quotes unless the text holds a single quote and no double quote.
fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    f.write_char(quote)?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => {
                f.write_char('\\')?;
                f.write_char(c)?;
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => write!(f, "\\x{:02x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char(quote)
}
