//! Artifact resolution for buildpack dependencies
//!
//! Resolves a dependency to a local, checksum-verified archive. Lookup order:
//!
//! | Source | Path | Written by |
//! |--------|------|------------|
//! | Offline cache | `{cache_dir}/{sha256}/{file}` | packager |
//! | Download cache | `{download_dir}/{sha256}/{file}` | this module |
//! | Origin | `uri` (https, http, file) | - |
//!
//! Downloads land in a temp file and are renamed into place only after the
//! checksum matches, so an interrupted fetch never poisons the cache.

use crate::dependency::BuildpackDependency;
use crate::error::{ScarbError, ScarbResult};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Source of local artifact files for dependencies
///
/// Implementations own fetching and checksum verification. Callers trust the
/// returned path.
#[async_trait]
pub trait DependencyResolver: Send + Sync {
    /// Return a readable local file holding the dependency's archive
    async fn artifact(&self, dependency: &BuildpackDependency) -> ScarbResult<PathBuf>;
}

/// Content-addressed artifact cache with download fallback
#[derive(Debug, Clone)]
pub struct DependencyCache {
    /// Read-only cache shipped alongside the buildpack, if any
    cache_dir: Option<PathBuf>,

    /// Writable directory for downloaded artifacts
    download_dir: PathBuf,
}

impl DependencyCache {
    /// Create a cache that downloads into `download_dir`
    pub fn new(download_dir: PathBuf) -> Self {
        Self {
            cache_dir: None,
            download_dir,
        }
    }

    /// Also consult a pre-populated offline cache
    pub fn with_offline_cache(mut self, cache_dir: PathBuf) -> Self {
        self.cache_dir = Some(cache_dir);
        self
    }

    /// Default download directory under the user cache dir
    pub fn default_download_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("scarb-buildpack")
            .join("dependencies")
    }

    fn cached_path(root: &Path, dependency: &BuildpackDependency) -> PathBuf {
        root.join(dependency.sha256.to_ascii_lowercase())
            .join(dependency.artifact_name())
    }

    /// Resolve synchronously; runs on a blocking thread
    fn resolve_blocking(&self, dependency: &BuildpackDependency) -> ScarbResult<PathBuf> {
        dependency.validate()?;

        if let Some(ref root) = self.cache_dir {
            let path = Self::cached_path(root, dependency);
            if path.is_file() {
                debug!("Found {} in offline cache", dependency.display_name());
                verify_sha256(&path, &dependency.sha256)?;
                return Ok(path);
            }
        }

        let path = Self::cached_path(&self.download_dir, dependency);
        if path.is_file() {
            debug!("Found {} in download cache", dependency.display_name());
            verify_sha256(&path, &dependency.sha256)?;
            return Ok(path);
        }

        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.download_dir.clone());
        fs::create_dir_all(&parent)
            .map_err(|e| ScarbError::io(format!("creating {}", parent.display()), e))?;

        let partial = parent.join(format!(".{}.partial", dependency.artifact_name()));
        let fetched = fetch(&dependency.uri, &partial)
            .and_then(|()| verify_sha256(&partial, &dependency.sha256));
        if let Err(e) = fetched {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }

        fs::rename(&partial, &path)
            .map_err(|e| ScarbError::io(format!("moving download to {}", path.display()), e))?;
        Ok(path)
    }
}

#[async_trait]
impl DependencyResolver for DependencyCache {
    async fn artifact(&self, dependency: &BuildpackDependency) -> ScarbResult<PathBuf> {
        let cache = self.clone();
        let dependency = dependency.clone();
        tokio::task::spawn_blocking(move || cache.resolve_blocking(&dependency)).await?
    }
}

/// Copy the artifact at `uri` into `dest`
fn fetch(uri: &str, dest: &Path) -> ScarbResult<()> {
    let mut out =
        File::create(dest).map_err(|e| ScarbError::io(format!("creating {}", dest.display()), e))?;

    if let Some(local) = uri.strip_prefix("file://") {
        info!("Copying {}", local);
        let mut src = File::open(local).map_err(|e| ScarbError::Download {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        io::copy(&mut src, &mut out)
            .map_err(|e| ScarbError::io(format!("writing {}", dest.display()), e))?;
        return Ok(());
    }

    if !(uri.starts_with("https://") || uri.starts_with("http://")) {
        return Err(ScarbError::UnsupportedUri(uri.to_string()));
    }

    info!("Downloading {}", uri);
    let response = ureq::get(uri).call().map_err(|e| ScarbError::Download {
        uri: uri.to_string(),
        reason: e.to_string(),
    })?;
    let mut body = response.into_body().into_reader();
    io::copy(&mut body, &mut out).map_err(|e| ScarbError::Download {
        uri: uri.to_string(),
        reason: e.to_string(),
    })?;
    Ok(())
}

/// Hash a file's contents, returning lowercase hex
pub(crate) fn sha256_file(path: &Path) -> ScarbResult<String> {
    let mut file =
        File::open(path).map_err(|e| ScarbError::io(format!("opening {}", path.display()), e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file
            .read(&mut buf)
            .map_err(|e| ScarbError::io(format!("reading {}", path.display()), e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn verify_sha256(path: &Path, expected: &str) -> ScarbResult<()> {
    let actual = sha256_file(path)?;
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(ScarbError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: expected.to_ascii_lowercase(),
            actual,
        })
    }
}
