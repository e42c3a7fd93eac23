//! Launch metadata
//!
//! Processes the final image can run, written to `<layers>/launch.toml`.

use crate::error::{ScarbError, ScarbResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A process type declared for the launch image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    #[serde(rename = "type")]
    pub kind: String,

    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub default: bool,
}

/// Contents of `launch.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Launch {
    #[serde(default)]
    pub processes: Vec<Process>,
}

impl Launch {
    pub fn path(layers_dir: &Path) -> PathBuf {
        layers_dir.join("launch.toml")
    }

    /// Write `launch.toml`; nothing is written when there are no processes
    pub async fn write(&self, layers_dir: &Path) -> ScarbResult<()> {
        if self.processes.is_empty() {
            return Ok(());
        }
        let path = Self::path(layers_dir);
        let content = toml::to_string_pretty(self)?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| ScarbError::io(format!("writing {}", path.display()), e))
    }
}
