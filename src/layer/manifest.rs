//! Layer manifest parsing
//!
//! Each layer has a `<layers>/<name>.toml` sidecar describing its retention
//! types and the metadata recorded by the last successful contribution.

use crate::error::{ScarbError, ScarbResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Retention flags for a layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerTypes {
    /// Visible to later buildpacks during the build
    pub build: bool,

    /// Restored on the next build
    pub cache: bool,

    /// Included in the final image
    pub launch: bool,
}

impl LayerTypes {
    /// Cached and available at build and launch time
    pub const fn all() -> Self {
        Self {
            build: true,
            cache: true,
            launch: true,
        }
    }
}

/// Parsed layer sidecar
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerManifest {
    /// Retention flags
    #[serde(default)]
    pub types: LayerTypes,

    /// Free-form metadata owned by the contributor
    #[serde(default)]
    pub metadata: toml::Table,
}

impl LayerManifest {
    /// Parse a manifest from a TOML file on disk
    pub async fn from_file(path: &Path) -> ScarbResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ScarbError::io(format!("reading layer manifest {}", path.display()), e))?;
        Self::parse(&content).map_err(|e| match e {
            ScarbError::ConfigInvalid { reason, .. } => ScarbError::ConfigInvalid {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse a manifest from a TOML string
    pub fn parse(content: &str) -> ScarbResult<Self> {
        toml::from_str(content).map_err(|e| ScarbError::ConfigInvalid {
            path: "layer.toml".into(),
            reason: e.to_string(),
        })
    }

    /// Write the manifest, replacing any previous file
    pub async fn write_to(&self, path: &Path) -> ScarbResult<()> {
        let content = toml::to_string_pretty(self)?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| ScarbError::io(format!("writing layer manifest {}", path.display()), e))
    }
}
