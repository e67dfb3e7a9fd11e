//! Sources of raw replay blobs.
//!
//! Replays are MPQ archives whose user data block holds the protocol header.
//! [`ReplayArchive`] reads them directly. [`ExtractedReplay`] reads a
//! directory of blobs unpacked by an external tool, one file per category,
//! with the user data header saved as `replay.header`.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::mpq::{MpqArchive, MpqError};
use crate::{Category, ContainerError};

/// Yields the raw bytes of each record category.
pub trait Container {
    fn read(&self, category: Category) -> Result<Vec<u8>, ContainerError>;
}

/// Opens a replay archive file, or a directory of blobs extracted from one.
pub fn open_replay(path: &Path) -> Result<Box<dyn Container>, ContainerError> {
    if path.is_dir() {
        Ok(Box::new(ExtractedReplay::open(path)?))
    } else {
        Ok(Box::new(ReplayArchive::open(path)?))
    }
}

/// A replay archive file (`.StormReplay`, `.SC2Replay`).
#[derive(Debug)]
pub struct ReplayArchive {
    path: PathBuf,
    header: Vec<u8>,
    archive: MpqArchive,
}

impl ReplayArchive {
    /// Reads and indexes the archive at `path`. The archive must carry a
    /// user data header.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ContainerError> {
        let path = path.into();
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(source) => return Err(ContainerError::Io { path, source }),
        };
        let archive = match MpqArchive::from_bytes(data) {
            Ok(archive) => archive,
            Err(source) => return Err(ContainerError::Format { path, source }),
        };
        let Some(header) = archive.user_data().map(<[u8]>::to_vec) else {
            return Err(ContainerError::Format {
                path,
                source: MpqError::MissingUserData,
            });
        };
        tracing::debug!("Opened replay archive {}", path.display());
        Ok(Self {
            path,
            header,
            archive,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Container for ReplayArchive {
    fn read(&self, category: Category) -> Result<Vec<u8>, ContainerError> {
        if category == Category::Header {
            return Ok(self.header.clone());
        }
        let file = category.archive_name();
        match self.archive.read_file(file) {
            Ok(Some(bytes)) => Ok(bytes),
            Ok(None) => Err(ContainerError::MissingBlob {
                container: self.path.clone(),
                file,
            }),
            Err(source) => Err(ContainerError::Format {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// A replay archive extracted into a directory.
#[derive(Debug, Clone)]
pub struct ExtractedReplay {
    dir: PathBuf,
}

impl ExtractedReplay {
    /// Opens `dir`, which must contain at least the header blob.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, ContainerError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(ContainerError::NotADirectory(dir));
        }
        let header = Category::Header.archive_name();
        if !dir.join(header).is_file() {
            return Err(ContainerError::MissingBlob {
                container: dir,
                file: header,
            });
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Container for ExtractedReplay {
    fn read(&self, category: Category) -> Result<Vec<u8>, ContainerError> {
        let file = category.archive_name();
        let path = self.dir.join(file);
        fs::read(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ContainerError::MissingBlob {
                    container: self.dir.clone(),
                    file,
                }
            } else {
                ContainerError::Io { path, source }
            }
        })
    }
}

/// Blobs held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    blobs: HashMap<Category, Vec<u8>>,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, category: Category, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(category, bytes);
        self
    }

    pub fn insert(&mut self, category: Category, bytes: impl Into<Vec<u8>>) {
        self.blobs.insert(category, bytes.into());
    }
}

impl Container for MemoryContainer {
    fn read(&self, category: Category) -> Result<Vec<u8>, ContainerError> {
        self.blobs
            .get(&category)
            .cloned()
            .ok_or_else(|| ContainerError::MissingBlob {
                container: PathBuf::from("<memory>"),
                file: category.archive_name(),
            })
    }
}
