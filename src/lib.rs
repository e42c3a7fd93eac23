//! Scarb Buildpack
//!
//! Detects Cairo projects by their `Scarb.toml` and installs a pinned Scarb
//! release into a cacheable layer, reusing the layer across builds while the
//! dependency fingerprint is unchanged.

pub mod archive;
pub mod cli;
pub mod config;
pub mod dependency;
pub mod detect;
pub mod error;
pub mod exec;
pub mod launch;
pub mod layer;
pub mod sbom;
pub mod scarb;

pub use error::{ScarbError, ScarbResult};
