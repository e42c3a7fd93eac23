//! Syft JSON software bill of materials
//!
//! Each contributed layer gets one SBOM document listing the artifacts it
//! installed. The document is written and never read back.

use crate::error::{ScarbError, ScarbResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// SBOM file formats understood by the CNB lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SbomFormat {
    CycloneDxJson,
    SpdxJson,
    SyftJson,
}

impl SbomFormat {
    pub const ALL: [SbomFormat; 3] = [Self::CycloneDxJson, Self::SpdxJson, Self::SyftJson];

    /// File extension used in `<layer>.sbom.<ext>`
    pub fn extension(&self) -> &'static str {
        match self {
            Self::CycloneDxJson => "cdx.json",
            Self::SpdxJson => "spdx.json",
            Self::SyftJson => "syft.json",
        }
    }
}

const SYFT_SCHEMA_VERSION: &str = "1.0.1";
const SYFT_SCHEMA_URL: &str =
    "https://raw.githubusercontent.com/anchore/syft/main/schema/json/schema-1.0.1.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyftLocation {
    #[serde(rename = "Path")]
    pub path: String,
}

/// One installed artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyftArtifact {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "FoundBy")]
    pub found_by: String,
    #[serde(rename = "Locations")]
    pub locations: Vec<SyftLocation>,
    #[serde(rename = "Licenses")]
    pub licenses: Vec<String>,
    #[serde(rename = "Language")]
    pub language: String,
    #[serde(rename = "CPEs")]
    pub cpes: Vec<String>,
    #[serde(rename = "PURL")]
    pub purl: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyftSource {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Target")]
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyftDescriptor {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Version")]
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyftSchema {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "URL")]
    pub url: String,
}

/// A complete Syft document describing one layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyftDependency {
    #[serde(rename = "Artifacts")]
    pub artifacts: Vec<SyftArtifact>,
    #[serde(rename = "Source")]
    pub source: SyftSource,
    #[serde(rename = "Descriptor")]
    pub descriptor: SyftDescriptor,
    #[serde(rename = "Schema")]
    pub schema: SyftSchema,
}

impl SyftDependency {
    /// Describe artifacts installed into the directory at `target`
    pub fn new(target: &Path, artifacts: Vec<SyftArtifact>) -> Self {
        Self {
            artifacts,
            source: SyftSource {
                kind: "directory".to_string(),
                target: target.display().to_string(),
            },
            descriptor: SyftDescriptor {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            schema: SyftSchema {
                version: SYFT_SCHEMA_VERSION.to_string(),
                url: SYFT_SCHEMA_URL.to_string(),
            },
        }
    }

    /// Write the document as pretty JSON, replacing any previous file
    pub async fn write_to(&self, path: &Path) -> ScarbResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ScarbError::io(format!("creating {}", parent.display()), e))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| ScarbError::io(format!("writing SBOM to {}", path.display()), e))
    }
}

/// SBOM path for a layer, a sibling of the layer directory
pub fn sbom_path(layers_dir: &Path, layer_name: &str, format: SbomFormat) -> PathBuf {
    layers_dir.join(format!("{}.sbom.{}", layer_name, format.extension()))
}
