//! Value model for decoded replay records.
//!
//! Decoders produce [`Node`] trees: scalars, ordered objects and arrays with
//! no fixed schema. The flattener and log writer in `hots-lambda-log`
//! consume them.

pub mod annotation;
mod display;
mod node;

pub use node::Node;
