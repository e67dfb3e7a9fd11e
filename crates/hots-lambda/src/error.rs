use std::io;
use std::path::PathBuf;

use hots_lambda_protocol::{DecodeError, ProtocolError};
use thiserror::Error;

use crate::mpq::MpqError;
use crate::Category;

/// The replay container is malformed or unreadable.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("{} is not a replay directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("{} has no {}", .container.display(), .file)]
    MissingBlob {
        container: PathBuf,
        file: &'static str,
    },
    #[error("{} is not a readable replay archive", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: MpqError,
    },
    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("failed to decode {category}")]
    Decode {
        category: Category,
        #[source]
        source: DecodeError,
    },
    #[error("replay header has no m_version.m_baseBuild")]
    MissingBaseBuild,
    #[error("failed to write output")]
    Output(#[from] io::Error),
}
