//! Configuration for todostore
//!
//! Stored as YAML, by default at `<config_dir>/todostore/todostore.yml`.

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_STORAGE_KEY: &str = "todo-storage";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,

    /// Default tracing level for the CLI (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            log_level: "warn".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Directory holding the blob file or the SQLite database
    pub path: PathBuf,

    /// Name of the persisted blob
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_data_dir(),
            key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Sqlite,
    Memory,
}

impl StorageBackend {
    pub const ALL: [StorageBackend; 3] = [StorageBackend::File, StorageBackend::Sqlite, StorageBackend::Memory];

    pub fn as_str(self) -> &'static str {
        match self {
            StorageBackend::File => "file",
            StorageBackend::Sqlite => "sqlite",
            StorageBackend::Memory => "memory",
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        StorageBackend::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| eyre!("Unknown backend: {} (expected file, sqlite or memory)", s))
    }
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Config {
    /// Load config from a YAML file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = ?path, "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).with_context(|| format!("Failed to read config {:?}", path))?;
        let config: Config =
            serde_yaml::from_str(&content).with_context(|| format!("Invalid config {:?}", path))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        fs::write(path, content).with_context(|| format!("Failed to write config {:?}", path))?;
        Ok(())
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("todostore")
        .join("todostore.yml")
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("todostore")
}
