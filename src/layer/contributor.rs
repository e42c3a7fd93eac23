//! Dependency layer contribution
//!
//! Installs a dependency into a layer at most once per fingerprint. A layer
//! whose recorded fingerprint equals the requested dependency's is returned
//! untouched; otherwise the artifact is resolved, the layer reset, the
//! caller's install step run, and the fingerprint recorded last so a failed
//! install is retried from scratch next time.
//!
//! | Recorded fingerprint | Action |
//! |----------------------|--------|
//! | equal | reuse, no resolver call, no writes to content |
//! | different | reset + install |
//! | missing / unreadable | reset + install |

use crate::dependency::{BuildpackDependency, DependencyFingerprint, DependencyResolver};
use crate::error::ScarbResult;
use crate::layer::manifest::LayerTypes;
use crate::layer::resolve::Layer;
use std::future::Future;
use std::path::PathBuf;
use tracing::{debug, info};

/// Metadata key holding the installed dependency's fingerprint
pub const DEPENDENCY_METADATA_KEY: &str = "dependency";

/// Whether a contribution reused the cached layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Recorded fingerprint matched, nothing was installed
    Hit,
    /// The dependency was installed into a reset layer
    Miss,
}

/// Contributes one dependency to one layer
#[derive(Debug, Clone)]
pub struct DependencyLayerContributor {
    dependency: BuildpackDependency,
    types: LayerTypes,
}

impl DependencyLayerContributor {
    pub fn new(dependency: BuildpackDependency, types: LayerTypes) -> Self {
        Self { dependency, types }
    }

    /// Layer name, one per dependency id
    pub fn layer_name(&self) -> &str {
        &self.dependency.id
    }

    pub fn dependency(&self) -> &BuildpackDependency {
        &self.dependency
    }

    /// Fingerprint recorded in the layer by a previous contribution
    pub fn recorded_fingerprint(layer: &Layer) -> Option<DependencyFingerprint> {
        let value = layer.metadata.get(DEPENDENCY_METADATA_KEY)?;
        let parsed: Result<DependencyFingerprint, _> = value.clone().try_into();
        match parsed {
            Ok(fingerprint) => Some(fingerprint),
            Err(e) => {
                debug!("Discarding unreadable layer metadata: {}", e);
                None
            }
        }
    }

    /// Whether the layer already holds exactly this dependency
    pub fn is_cached(&self, layer: &Layer) -> bool {
        Self::recorded_fingerprint(layer).as_ref() == Some(&self.dependency.fingerprint())
    }

    /// Ensure the layer holds the dependency, running `install` on a miss.
    ///
    /// `install` receives the local artifact and the freshly reset layer and
    /// returns the populated layer.
    pub async fn contribute<F, Fut>(
        &self,
        layer: Layer,
        resolver: &dyn DependencyResolver,
        install: F,
    ) -> ScarbResult<(Layer, CacheOutcome)>
    where
        F: FnOnce(PathBuf, Layer) -> Fut,
        Fut: Future<Output = ScarbResult<Layer>>,
    {
        let expected = self.dependency.fingerprint();
        let mut layer = layer;

        if self.is_cached(&layer) {
            info!(
                "{}: Reusing cached layer {}",
                self.dependency.display_name(),
                layer.path.display()
            );
            if layer.types != self.types {
                layer.types = self.types;
                layer.write_manifest().await?;
            }
            return Ok((layer, CacheOutcome::Hit));
        }

        if let Some(recorded) = Self::recorded_fingerprint(&layer) {
            debug!(
                "Layer fingerprint changed: {} ({}) -> {} ({})",
                recorded.version, recorded.sha256, expected.version, expected.sha256
            );
        }
        info!(
            "{}: Contributing to layer {}",
            self.dependency.display_name(),
            layer.path.display()
        );

        let artifact = self.resolver_artifact(resolver).await?;

        layer.reset().await?;
        let mut layer = install(artifact, layer).await?;
        layer.write_env().await?;

        layer.metadata.insert(
            DEPENDENCY_METADATA_KEY.to_string(),
            toml::Value::try_from(&expected)?,
        );
        layer.types = self.types;
        layer.write_manifest().await?;

        Ok((layer, CacheOutcome::Miss))
    }

    async fn resolver_artifact(&self, resolver: &dyn DependencyResolver) -> ScarbResult<PathBuf> {
        let artifact = resolver.artifact(&self.dependency).await?;
        debug!("Resolved {} to {}", self.dependency.display_name(), artifact.display());
        Ok(artifact)
    }
}
