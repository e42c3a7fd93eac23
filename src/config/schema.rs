//! Buildpack descriptor schema
//!
//! The descriptor is the buildpack's own `buildpack.toml`. Only the parts
//! this buildpack reads are modelled; unknown keys are ignored.

use crate::dependency::BuildpackDependency;
use crate::layer::LayerTypes;
use serde::{Deserialize, Serialize};

/// Root of `buildpack.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Buildpack API version
    pub api: String,

    /// Identity of the buildpack
    pub buildpack: BuildpackInfo,

    /// Dependencies and layer settings
    pub metadata: MetadataConfig,
}

/// `[buildpack]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildpackInfo {
    pub id: String,
    pub name: String,
    pub version: String,
    pub homepage: Option<String>,
}

impl Default for BuildpackInfo {
    fn default() -> Self {
        Self {
            id: "scarb-buildpack".to_string(),
            name: "Scarb Buildpack".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            homepage: None,
        }
    }
}

/// `[metadata]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Version installed when none is requested
    pub default_version: Option<String>,

    /// Retention types for the toolchain layer
    pub layer: LayerTypes,

    /// Installable toolchain archives
    pub dependencies: Vec<BuildpackDependency>,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            default_version: None,
            layer: LayerTypes::all(),
            dependencies: vec![],
        }
    }
}
