//! Layer resolution
//!
//! Opens a named layer inside the host-supplied layers directory:
//! - content: `{layers_dir}/{name}/`
//! - sidecar: `{layers_dir}/{name}.toml`
//!
//! A sidecar only counts when the content directory survived alongside it.

use crate::error::{ScarbError, ScarbResult};
use crate::layer::manifest::{LayerManifest, LayerTypes};
use crate::layer::path::{append_if_absent, join_dirs, PATH_DELIMITER};
use crate::sbom::{sbom_path, SbomFormat};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The host's layers directory
#[derive(Debug, Clone)]
pub struct Layers {
    pub path: PathBuf,
}

/// A layer owned by one contributor for the duration of a build
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: String,

    /// Content directory
    pub path: PathBuf,

    layers_dir: PathBuf,

    /// Retention flags
    pub types: LayerTypes,

    /// Metadata restored from the previous build, then rewritten on contribution
    pub metadata: toml::Table,

    /// Directories the host should put at the front of `PATH`
    pub path_prepend: Vec<PathBuf>,
}

impl Layers {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Open the layer called `name`, restoring its sidecar if present
    pub async fn layer(&self, name: &str) -> ScarbResult<Layer> {
        validate_layer_name(name)?;

        let mut layer = Layer::detached(name, self.path.clone());

        let manifest_path = layer.manifest_path();
        if !manifest_path.exists() {
            return Ok(layer);
        }
        if !layer.path.is_dir() {
            debug!(
                "Ignoring {}: layer directory was not restored",
                manifest_path.display()
            );
            return Ok(layer);
        }

        let manifest = LayerManifest::from_file(&manifest_path).await?;
        layer.types = manifest.types;
        layer.metadata = manifest.metadata;
        Ok(layer)
    }
}

impl Layer {
    /// A layer with no restored state
    pub(crate) fn detached(name: &str, layers_dir: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            path: layers_dir.join(name),
            layers_dir,
            types: LayerTypes::default(),
            metadata: toml::Table::new(),
            path_prepend: vec![],
        }
    }

    /// Path of the `<layers>/<name>.toml` sidecar
    pub fn manifest_path(&self) -> PathBuf {
        self.layers_dir.join(format!("{}.toml", self.name))
    }

    /// Path of this layer's SBOM in the given format
    pub fn sbom_path(&self, format: SbomFormat) -> PathBuf {
        sbom_path(&self.layers_dir, &self.name, format)
    }

    /// The layer's `bin` directory
    pub fn bin_dir(&self) -> PathBuf {
        self.path.join("bin")
    }

    pub fn layers_dir(&self) -> &Path {
        &self.layers_dir
    }

    /// Add a directory to the front-of-PATH list unless already present
    pub fn prepend_path(&mut self, dir: PathBuf) {
        append_if_absent(&mut self.path_prepend, dir);
    }

    /// Remove all content and stale metadata, leaving an empty directory.
    ///
    /// The sidecar and SBOM files go first: a layer emptied by a failed
    /// install must not be restored next build with its old metadata.
    pub async fn reset(&mut self) -> ScarbResult<()> {
        remove_file_if_present(&self.manifest_path()).await?;
        for format in SbomFormat::ALL {
            remove_file_if_present(&self.sbom_path(format)).await?;
        }

        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ScarbError::io(
                    format!("removing layer {}", self.path.display()),
                    e,
                ))
            }
        }
        tokio::fs::create_dir_all(&self.path)
            .await
            .map_err(|e| ScarbError::io(format!("creating layer {}", self.path.display()), e))?;

        self.metadata.clear();
        self.path_prepend.clear();
        Ok(())
    }

    /// Write `path_prepend` as the lifecycle's `env/PATH.prepend` pair
    pub async fn write_env(&self) -> ScarbResult<()> {
        if self.path_prepend.is_empty() {
            return Ok(());
        }

        let env_dir = self.path.join("env");
        tokio::fs::create_dir_all(&env_dir)
            .await
            .map_err(|e| ScarbError::io(format!("creating {}", env_dir.display()), e))?;

        let value = join_dirs(&self.path_prepend)?;
        let prepend = env_dir.join("PATH.prepend");
        tokio::fs::write(&prepend, value.as_encoded_bytes())
            .await
            .map_err(|e| ScarbError::io(format!("writing {}", prepend.display()), e))?;

        let delim = env_dir.join("PATH.delim");
        tokio::fs::write(&delim, PATH_DELIMITER)
            .await
            .map_err(|e| ScarbError::io(format!("writing {}", delim.display()), e))?;

        debug!("Wrote {}", prepend.display());
        Ok(())
    }

    /// Persist types and metadata to the sidecar
    pub async fn write_manifest(&self) -> ScarbResult<()> {
        let manifest = LayerManifest {
            types: self.types,
            metadata: self.metadata.clone(),
        };
        manifest.write_to(&self.manifest_path()).await
    }
}

async fn remove_file_if_present(path: &Path) -> ScarbResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ScarbError::io(format!("removing {}", path.display()), e)),
    }
}

/// Validate that a layer name is safe (no path traversal, no special characters).
fn validate_layer_name(name: &str) -> ScarbResult<()> {
    let invalid = |reason: &str| ScarbError::ConfigInvalid {
        path: PathBuf::from(name),
        reason: format!("invalid layer name: {}", reason),
    };

    if name.is_empty() {
        return Err(invalid("must not be empty"));
    }
    // "launch", "build" and "store" collide with lifecycle files
    if matches!(name, "launch" | "build" | "store") {
        return Err(invalid("reserved by the lifecycle"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(invalid(
            "must contain only alphanumeric characters, hyphens, or underscores",
        ));
    }
    Ok(())
}
