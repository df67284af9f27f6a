//! Configuration management for gsbuild

pub mod schema;

pub use schema::Config;

use crate::error::{GsbuildError, GsbuildResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
    explicit: bool,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
            explicit: false,
        }
    }

    /// Create a config manager with a custom path, which must exist
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            config_path: path,
            explicit: true,
        }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gsbuild")
            .join("config.toml")
    }

    /// Get the default download cache directory
    pub fn default_cache_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("gsbuild")
            .join("ghostscript")
    }

    /// Load configuration, using defaults if the default file is absent
    pub async fn load(&self) -> GsbuildResult<Config> {
        if !self.config_path.exists() {
            if self.explicit {
                return Err(GsbuildError::ConfigNotFound(self.config_path.clone()));
            }
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> GsbuildResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| GsbuildError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| GsbuildError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
