//! Buildpack dependency descriptors
//!
//! A dependency is declared in `buildpack.toml` and identifies one
//! downloadable toolchain archive. Its fingerprint is the cache key for the
//! installed layer: the SHA-256 pins the bytes, so equal fingerprints mean an
//! identical install.

pub mod cache;

pub use cache::{DependencyCache, DependencyResolver};

use crate::error::{ScarbError, ScarbResult};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};
use tracing::debug;

/// License attached to a dependency
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// SPDX identifier
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Where the license text lives
    #[serde(default)]
    pub uri: String,
}

/// A toolchain archive declared by the buildpack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildpackDependency {
    pub id: String,

    #[serde(default)]
    pub name: String,

    pub version: String,

    pub uri: String,

    /// Hex SHA-256 of the archive at `uri`
    pub sha256: String,

    #[serde(default)]
    pub stacks: Vec<String>,

    #[serde(default)]
    pub licenses: Vec<License>,

    #[serde(default)]
    pub purl: String,

    #[serde(default)]
    pub cpes: Vec<String>,
}

/// The part of a dependency that determines installed content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyFingerprint {
    pub id: String,
    pub version: String,
    pub uri: String,
    pub sha256: String,
}

impl BuildpackDependency {
    /// Cache key for layers built from this dependency
    pub fn fingerprint(&self) -> DependencyFingerprint {
        DependencyFingerprint {
            id: self.id.clone(),
            version: self.version.clone(),
            uri: self.uri.clone(),
            sha256: self.sha256.to_ascii_lowercase(),
        }
    }

    /// File name of the artifact, taken from the last URI segment
    pub fn artifact_name(&self) -> String {
        let segment = self.uri.rsplit('/').next().unwrap_or_default();
        match segment.split(['?', '#']).next().unwrap_or_default() {
            "" | "." | ".." => format!("{}-{}", self.id, self.version),
            name => name.to_string(),
        }
    }

    /// Check the fields that become cache path components.
    ///
    /// `sha256` must be hex and the artifact name a single plain file name.
    pub fn validate(&self) -> ScarbResult<()> {
        let invalid = |reason: String| ScarbError::InvalidDependency {
            id: self.id.clone(),
            reason,
        };

        if self.sha256.is_empty() || !self.sha256.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid(format!("sha256 '{}' is not hex", self.sha256)));
        }

        let name = self.artifact_name();
        let mut components = Path::new(&name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(()),
            _ => Err(invalid(format!(
                "artifact name '{}' is not a plain file name",
                name
            ))),
        }
    }

    /// Human-readable label for log lines
    pub fn display_name(&self) -> String {
        let name = if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        };
        format!("{} {}", name, self.version)
    }
}

/// Pick the dependency to install.
///
/// With a requested version, only an exact match is accepted. Without one,
/// the highest semantic version among entries with `id` wins.
pub fn select_dependency(
    dependencies: &[BuildpackDependency],
    id: &str,
    version: Option<&str>,
) -> ScarbResult<BuildpackDependency> {
    let mut candidates = dependencies.iter().filter(|d| d.id == id);

    let selected = match version {
        Some(wanted) => {
            let wanted = wanted.trim_start_matches('v');
            candidates.find(|d| d.version == wanted)
        }
        None => candidates.max_by(|a, b| {
            let va = semver::Version::parse(&a.version).ok();
            let vb = semver::Version::parse(&b.version).ok();
            va.cmp(&vb)
        }),
    };

    match selected {
        Some(dep) => {
            debug!("Selected dependency {}", dep.display_name());
            Ok(dep.clone())
        }
        None => Err(ScarbError::DependencyNotFound {
            id: id.to_string(),
            version: version.unwrap_or("*").to_string(),
        }),
    }
}
