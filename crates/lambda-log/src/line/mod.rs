//! Rendering of a flat record as one lambda log line.
//!
//! Each field becomes `key[value]`, fields are joined with `,`. Nothing is
//! escaped: a value containing `,`, `[` or `]` makes the line ambiguous to
//! a strict parser. Consumers are expected to be permissive.

use std::fmt;
use std::io::{self, Write};

use crate::FlatRecord;

/// Display adapter writing a [`FlatRecord`] in lambda log form.
pub struct LambdaLine<'a>(pub &'a FlatRecord);

impl fmt::Display for LambdaLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{key}[{value}]")?;
        }
        Ok(())
    }
}

pub fn to_lambda_line(record: &FlatRecord) -> String {
    LambdaLine(record).to_string()
}

/// Write `record` followed by a newline.
pub fn write_lambda_line<W: Write + ?Sized>(out: &mut W, record: &FlatRecord) -> io::Result<()> {
    writeln!(out, "{}", LambdaLine(record))
}
