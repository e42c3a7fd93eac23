//! Cacheable build layers
//!
//! A layer is a directory under the host's layers directory plus a TOML
//! sidecar recording its retention types and contributor metadata. The
//! contributor here decides between reusing a restored layer and rebuilding
//! it from a dependency artifact.

pub mod contributor;
pub mod manifest;
pub mod path;
pub mod resolve;

pub use contributor::{CacheOutcome, DependencyLayerContributor};
pub use manifest::{LayerManifest, LayerTypes};
pub use resolve::{Layer, Layers};
