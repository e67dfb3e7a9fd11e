//! Replay to lambda log conversion.
//!
//! A [`Session`] drives one replay through the pipeline: read the header
//! from a [`Container`], resolve the protocol for its base build, decode the
//! requested [`Category`] blobs and write each record as a flat
//! `key[value],...` line.
//!
//! ```no_run
//! use hots_lambda::{ReplayArchive, Request, Session, SessionOptions};
//! use hots_lambda_protocol::{ProtocolRegistry, DEFAULT_BUILD};
//!
//! let registry = ProtocolRegistry::load_dir("protocols".as_ref(), DEFAULT_BUILD)?;
//! let replay = ReplayArchive::open("match.StormReplay")?;
//! let mut session = Session::new(&registry, SessionOptions::default());
//! session.run(&replay, &Request::all(), &mut std::io::stdout(), &mut std::io::stderr())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod category;
pub mod config;
mod container;
mod error;
mod mpq;
mod session;

pub use category::Category;
pub use config::{Config, ConfigError};
pub use container::{open_replay, Container, ExtractedReplay, MemoryContainer, ReplayArchive};
pub use error::{ContainerError, SessionError};
pub use mpq::{MpqArchive, MpqError};
pub use session::{CategoryFailure, Request, Session, SessionOptions, SessionReport};
