//! Command-line interface
//!
//! The host lifecycle runs `scarb-buildpack detect` and
//! `scarb-buildpack build`.

pub mod args;
pub mod commands;

pub use args::{BuildArgs, Cli, Commands, DetectArgs};
