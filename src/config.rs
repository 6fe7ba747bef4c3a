/// Device configuration for the photo feature
///
/// Stored as TOML in the user's config directory:
/// - Linux: ~/.config/crew-photos/config.toml
/// - macOS: ~/Library/Application Support/crew-photos/config.toml
/// - Windows: %APPDATA%\crew-photos\config.toml
///
/// `CREW_PHOTOS_CONFIG` points at a different file.
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::capture::location::DEFAULT_LOCATION_TIMEOUT;
use crate::state::{Coordinates, PhotoStore};

const APP_DIR: &str = "crew-photos";
const CONFIG_ENV: &str = "CREW_PHOTOS_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to write config file {path}: {reason}")]
    Write { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file holding the photos
    pub database_path: PathBuf,
    /// Longest a capture waits for a location fix
    pub location_timeout_secs: u64,
    /// Optional cap on the database size, in SQLite pages
    pub storage_limit_pages: Option<u32>,
    /// Position to tag photos with on devices without positioning
    pub fixed_location: Option<Coordinates>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            location_timeout_secs: 5,
            storage_limit_pages: None,
            fixed_location: None,
        }
    }
}

impl Config {
    /// Path of the config file, honouring `CREW_PHOTOS_CONFIG`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_default()
            .join(APP_DIR)
            .join("config.toml")
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Read the config at `path`, writing the defaults there first if
    /// the file doesn't exist yet.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            if let Err(e) = config.save_to(path) {
                tracing::warn!("⚠️  Could not write default config: {}", e);
            }
            return Ok(config);
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |reason: String| ConfigError::Write {
            path: path.to_path_buf(),
            reason,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
        }
        let content = toml::to_string(self).map_err(|e| write_err(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| write_err(e.to_string()))
    }

    /// Location wait, never longer than the 5 second bound
    pub fn location_timeout(&self) -> Duration {
        Duration::from_secs(self.location_timeout_secs).min(DEFAULT_LOCATION_TIMEOUT)
    }

    /// Build the (unopened) photo store this config describes
    pub fn photo_store(&self) -> PhotoStore {
        PhotoStore::new(&self.database_path).with_page_limit(self.storage_limit_pages)
    }
}

/// ~/.local/share/crew-photos/photos.db on Linux
fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_default()
        .join(APP_DIR)
        .join("photos.db")
}
