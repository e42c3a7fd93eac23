//! Project detection
//!
//! A project takes part in the build when `Scarb.toml` exists at its root.
//! The file is never parsed.

use crate::error::{ScarbError, ScarbResult};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Marker file that identifies a Cairo project managed by Scarb
pub const MARKER_FILE: &str = "Scarb.toml";

/// Build plan entry both provided and required by this buildpack
pub const PLAN_ENTRY_SCARB: &str = "scarb";

/// A named capability in a build plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub name: String,
}

/// One build plan: what this buildpack offers and what it needs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
    #[serde(default)]
    pub provides: Vec<PlanEntry>,
    #[serde(default)]
    pub requires: Vec<PlanEntry>,
}

/// Outcome of a detection pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectResult {
    pub pass: bool,
    pub plans: Vec<BuildPlan>,
}

impl DetectResult {
    /// Serialize the first plan in the host's plan TOML layout
    pub fn plan_toml(&self) -> ScarbResult<String> {
        let plan = self.plans.first().cloned().unwrap_or_default();
        Ok(toml::to_string_pretty(&plan)?)
    }
}

/// Stateless detector for Scarb projects
#[derive(Debug, Clone, Copy, Default)]
pub struct Detector;

impl Detector {
    /// Decide whether the application at `app_dir` needs Scarb
    pub async fn detect(&self, app_dir: &Path) -> ScarbResult<DetectResult> {
        if !Self::cairo_project(app_dir).await? {
            debug!("No {} in {}", MARKER_FILE, app_dir.display());
            return Ok(DetectResult {
                pass: false,
                plans: vec![],
            });
        }

        let entry = PlanEntry {
            name: PLAN_ENTRY_SCARB.to_string(),
        };
        Ok(DetectResult {
            pass: true,
            plans: vec![BuildPlan {
                provides: vec![entry.clone()],
                requires: vec![entry],
            }],
        })
    }

    /// Check for the marker file; only NotFound counts as absent
    async fn cairo_project(app_dir: &Path) -> ScarbResult<bool> {
        match tokio::fs::metadata(app_dir.join(MARKER_FILE)).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ScarbError::Detect {
                marker: MARKER_FILE,
                app_dir: app_dir.to_path_buf(),
                source: e,
            }),
        }
    }
}
