//! Configuration management for the Scarb buildpack
//!
//! Static configuration comes from the buildpack's `buildpack.toml`;
//! per-build settings come from `BP_*` environment variables via the CLI.

pub mod schema;

pub use schema::Config;

use crate::error::{ScarbError, ScarbResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// File name of the buildpack descriptor
pub const DESCRIPTOR_FILE: &str = "buildpack.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a config manager reading `<buildpack_dir>/buildpack.toml`
    pub fn for_buildpack(buildpack_dir: &Path) -> Self {
        Self {
            config_path: buildpack_dir.join(DESCRIPTOR_FILE),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Directory for downloaded dependency artifacts
    pub fn download_dir() -> PathBuf {
        crate::dependency::DependencyCache::default_download_dir()
    }

    /// Load configuration, using defaults if the descriptor is missing
    pub async fn load(&self) -> ScarbResult<Config> {
        if !self.config_path.exists() {
            debug!(
                "{} not found, using defaults",
                self.config_path.display()
            );
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> ScarbResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| ScarbError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| ScarbError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}
