use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::fiff::SplitSize;

pub const DEFAULT_PROMPT: &str = "qf> ";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// User settings read from `<config dir>/quickfif/config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Largest file written when saving a split recording.
    pub split_size: SplitSize,
    pub console_prompt: String,
    /// `tracing` filter directives used when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            split_size: SplitSize::default(),
            console_prompt: DEFAULT_PROMPT.to_string(),
            log_filter: None,
        }
    }
}

impl AppConfig {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("quickfif").join("config.json"))
    }

    /// Reads the user config; no config directory or file means defaults.
    pub fn read() -> Result<Self, ConfigError> {
        match Self::config_path() {
            Some(path) => Self::read_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn read_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
