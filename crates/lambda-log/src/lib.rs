//! Lambda log output for decoded replay records.
//!
//! - [`flatten`] turns a nested [`Node`](hots_lambda_value::Node) into a
//!   [`FlatRecord`]
//! - [`line`] renders a flat record as a single `key[value],...` line
//! - [`stats`] accumulates per event kind counts and sizes

pub mod flatten;
pub mod line;
pub mod stats;

pub use flatten::{flatten, flatten_with, FlatRecord, FlattenOptions, DEFAULT_SEPARATOR};
pub use line::{to_lambda_line, write_lambda_line, LambdaLine};
pub use stats::{EventStat, EventStats, StatRow};
