//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Scarb Buildpack
///
/// Detects Cairo projects and installs the Scarb toolchain into a
/// cacheable build layer.
#[derive(Parser, Debug)]
#[command(name = "scarb-buildpack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log level; DEBUG enables debug output
    #[arg(long, global = true, env = "BP_LOG_LEVEL", hide = true)]
    pub log_level: Option<String>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check whether the application needs Scarb (exit 100 when not)
    Detect(DetectArgs),

    /// Install Scarb into the layers directory
    Build(BuildArgs),
}

/// Arguments for the detect command
#[derive(Parser, Debug)]
pub struct DetectArgs {
    /// Application directory
    #[arg(long, env = "CNB_APP_DIR", default_value = ".")]
    pub app: PathBuf,

    /// Where to write the build plan on a pass
    #[arg(long, env = "CNB_BUILD_PLAN_PATH")]
    pub plan: Option<PathBuf>,
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Application directory
    #[arg(long, env = "CNB_APP_DIR", default_value = ".")]
    pub app: PathBuf,

    /// Layers directory owned by this buildpack
    #[arg(long, env = "CNB_LAYERS_DIR")]
    pub layers: PathBuf,

    /// Buildpack directory containing buildpack.toml
    #[arg(long, env = "CNB_BUILDPACK_DIR", default_value = ".")]
    pub buildpack: PathBuf,

    /// Buildpack plan handed over by the lifecycle
    #[arg(long, env = "CNB_BP_PLAN_PATH")]
    pub plan: Option<PathBuf>,

    /// Scarb version to install (exact match)
    #[arg(long = "scarb-version", env = "BP_SCARB_VERSION")]
    pub scarb_version: Option<String>,

    /// Set to "true" to add a `scarb build` launch process
    #[arg(long, env = "BP_ENABLE_SCARB_PROCESS", default_value = "false")]
    pub enable_process: String,

    /// Pre-populated artifact cache, laid out as <sha256>/<file>
    #[arg(long, env = "BP_DEPENDENCY_CACHE")]
    pub dependency_cache: Option<PathBuf>,

    /// Where downloaded artifacts are kept between builds
    #[arg(long, env = "BP_DOWNLOAD_DIR")]
    pub download_dir: Option<PathBuf>,
}
