//! Scarb Buildpack
//!
//! CLI entry point invoked by the buildpack lifecycle.

use clap::Parser;
use console::style;
use scarb_buildpack::cli::{Cli, Commands};
use scarb_buildpack::error::ScarbResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit code telling the lifecycle that detection did not pass
const DETECT_FAIL: u8 = 100;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> ScarbResult<ExitCode> {
    let cli = Cli::parse();

    // 0 = warn, 1 = info, 2+ = debug; BP_LOG_LEVEL=DEBUG forces debug
    let debug_env = cli
        .log_level
        .as_deref()
        .is_some_and(|l| l.eq_ignore_ascii_case("debug"));
    let filter = match (cli.verbose, debug_env) {
        (_, true) | (2.., _) => EnvFilter::new("scarb_buildpack=debug"),
        (1, _) => EnvFilter::new("scarb_buildpack=info"),
        _ => EnvFilter::new("scarb_buildpack=warn"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Commands::Detect(args) => {
            if scarb_buildpack::cli::commands::detect(args).await? {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(DETECT_FAIL))
            }
        }
        Commands::Build(args) => {
            scarb_buildpack::cli::commands::build(args).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
