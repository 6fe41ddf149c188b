//! Configuration for browse sessions.
//!
//! New sessions take their paging settings from the browser's [`Config`].
//! Settings can be loaded from a TOML file:
//!
//! ```toml
//! chunk_size = 30
//! fetch_threshold = 10
//! loading_type = "fetch-more"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::browse::LoadingType;
use crate::{Error, Result};

/// Paging defaults for new sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Rows requested per fetch.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Reading within this many rows of the end of the window prefetches
    /// the next chunk.
    #[serde(default = "default_fetch_threshold")]
    pub fetch_threshold: usize,

    /// How rows are loaded.
    #[serde(default)]
    pub loading_type: LoadingType,
}

fn default_chunk_size() -> usize {
    30
}

fn default_fetch_threshold() -> usize {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            fetch_threshold: default_fetch_threshold(),
            loading_type: LoadingType::default(),
        }
    }
}

impl Config {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file, or fall back to defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::from_toml_str(&contents)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config as TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than 0".to_string()));
        }
        Ok(())
    }
}
