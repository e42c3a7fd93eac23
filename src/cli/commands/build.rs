//! Build command - install Scarb into its layer

use crate::cli::args::BuildArgs;
use crate::config::ConfigManager;
use crate::dependency::{select_dependency, DependencyCache};
use crate::error::ScarbResult;
use crate::exec::CommandExecutor;
use crate::launch::Launch;
use crate::layer::Layers;
use crate::scarb::{Scarb, BINARY_NAME};
use console::style;
use tracing::debug;

/// Directory inside the buildpack that may ship pre-downloaded artifacts
const BUNDLED_DEPENDENCIES_DIR: &str = "dependencies";

/// Execute the build command
pub async fn execute(args: BuildArgs) -> ScarbResult<()> {
    debug!("Building application in {}", args.app.display());
    if let Some(plan) = &args.plan {
        debug!("Buildpack plan at {}", plan.display());
    }
    let config = ConfigManager::for_buildpack(&args.buildpack).load().await?;
    println!(
        "{} {}",
        style(&config.buildpack.name).bold(),
        config.buildpack.version
    );

    let requested = args
        .scarb_version
        .as_deref()
        .or(config.metadata.default_version.as_deref());
    let dependency = select_dependency(&config.metadata.dependencies, BINARY_NAME, requested)?;

    let mut cache = DependencyCache::new(
        args.download_dir
            .clone()
            .unwrap_or_else(ConfigManager::download_dir),
    );
    let bundled = args.buildpack.join(BUNDLED_DEPENDENCIES_DIR);
    if let Some(dir) = args.dependency_cache.clone() {
        cache = cache.with_offline_cache(dir);
    } else if bundled.is_dir() {
        debug!("Using bundled dependencies in {}", bundled.display());
        cache = cache.with_offline_cache(bundled);
    }

    let scarb = Scarb::new(dependency, config.metadata.layer);
    let layer = Layers::new(&args.layers).layer(scarb.name()).await?;
    let layer = scarb.contribute(layer, &cache, &CommandExecutor).await?;

    let launch = Launch {
        processes: scarb.build_process_types(&args.enable_process),
    };
    launch.write(&args.layers).await?;

    println!(
        "{} Scarb {} available in {}",
        style("✓").green(),
        style(&scarb.version).cyan(),
        layer.bin_dir().display()
    );
    for process in &launch.processes {
        println!(
            "  Process {}: {} {}",
            style(&process.kind).cyan(),
            process.command,
            process.args.join(" ")
        );
    }

    Ok(())
}
