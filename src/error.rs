//! Error types for the Scarb buildpack
//!
//! All modules use `ScarbResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for buildpack operations
pub type ScarbResult<T> = Result<T, ScarbError>;

/// All errors that can occur while detecting or building
#[derive(Error, Debug)]
pub enum ScarbError {
    // Detection errors
    #[error("Unable to determine if {marker} exists in {}", .app_dir.display())]
    Detect {
        marker: &'static str,
        app_dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("No dependency '{id}' found matching version {version}")]
    DependencyNotFound { id: String, version: String },

    #[error("Invalid dependency '{id}': {reason}")]
    InvalidDependency { id: String, reason: String },

    // Artifact acquisition errors
    #[error("Unable to download {uri}: {reason}")]
    Download { uri: String, reason: String },

    #[error("SHA256 mismatch for {}: expected {expected}, got {actual}", .path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Unsupported dependency URI: {0}")]
    UnsupportedUri(String),

    // Extraction errors
    #[error("Unable to expand {}", .artifact.display())]
    Archive {
        artifact: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Refusing to extract archive entry {entry}: {reason}")]
    ArchiveEntry { entry: String, reason: String },

    // Verification errors
    #[error("Error executing '{command}'\n Combined Output: {output}")]
    VersionCheck {
        command: String,
        output: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with code {code}\n Combined Output: {output}")]
    VersionCheckExit {
        command: String,
        code: i32,
        output: String,
    },

    #[error("Unable to parse a version from output: {output}")]
    VersionParse { output: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl ScarbError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an extraction error for an artifact
    pub fn archive(artifact: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Archive {
            artifact: artifact.into(),
            source,
        }
    }

    /// Create an unsafe archive entry error
    pub fn archive_entry(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ArchiveEntry {
            entry: entry.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure happened while verifying the installed toolchain
    pub fn is_verification(&self) -> bool {
        matches!(
            self,
            Self::VersionCheck { .. } | Self::VersionCheckExit { .. } | Self::VersionParse { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::DependencyNotFound { .. } => {
                Some("Set BP_SCARB_VERSION to a version listed in buildpack.toml")
            }
            Self::InvalidDependency { .. } => {
                Some("Check the sha256 and uri of the dependency in buildpack.toml")
            }
            Self::ChecksumMismatch { .. } => {
                Some("Remove the cached artifact or correct the sha256 in buildpack.toml")
            }
            Self::VersionCheck { .. } | Self::VersionCheckExit { .. } => {
                Some("The downloaded Scarb binary may not match this platform")
            }
            _ => None,
        }
    }
}
