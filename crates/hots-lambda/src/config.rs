//! Optional TOML settings file.
//!
//! ```toml
//! protocols_dir = "/opt/hots/protocols"
//! fallback_build = 34835
//! separator = "_"
//! keep_going = false
//! ```
//!
//! Every key is optional. Command-line flags take precedence.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use hots_lambda_log::DEFAULT_SEPARATOR;
use hots_lambda_protocol::DEFAULT_BUILD;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding `protocol<BUILD>.json` definitions.
    pub protocols_dir: Option<PathBuf>,
    /// Build used to read headers and to decode unknown builds.
    pub fallback_build: u32,
    /// Flat key path separator.
    pub separator: String,
    /// Report a category that fails to decode and continue with the rest.
    pub keep_going: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            protocols_dir: None,
            fallback_build: DEFAULT_BUILD,
            separator: DEFAULT_SEPARATOR.to_string(),
            keep_going: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config file")]
    Parse(#[from] toml::de::Error),
    #[error("separator must not be empty")]
    EmptySeparator,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.separator.is_empty() {
            return Err(ConfigError::EmptySeparator);
        }
        Ok(())
    }
}
