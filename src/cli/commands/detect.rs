//! Detect command - decide whether the app needs Scarb

use crate::cli::args::DetectArgs;
use crate::detect::Detector;
use crate::error::{ScarbError, ScarbResult};
use console::style;

/// Execute the detect command, returning whether detection passed
pub async fn execute(args: DetectArgs) -> ScarbResult<bool> {
    let result = Detector.detect(&args.app).await?;

    if !result.pass {
        println!("{} No Scarb.toml found, skipping", style("-").dim());
        return Ok(false);
    }

    if let Some(plan_path) = &args.plan {
        let content = result.plan_toml()?;
        tokio::fs::write(plan_path, content).await.map_err(|e| {
            ScarbError::io(format!("writing build plan {}", plan_path.display()), e)
        })?;
    }

    println!("{} Scarb.toml found", style("✓").green());
    Ok(true)
}
