//! Scarb toolchain layer
//!
//! Installs one Scarb release into the `scarb` layer: expand the archive,
//! make the binary executable, put `bin` on the layer's path list, run
//! `scarb -V`, and describe the result in a Syft SBOM.

use crate::archive;
use crate::dependency::{BuildpackDependency, DependencyResolver};
use crate::error::{ScarbError, ScarbResult};
use crate::exec::{Execution, Executor};
use crate::launch::Process;
use crate::layer::path::child_path;
use crate::layer::{CacheOutcome, DependencyLayerContributor, Layer, LayerTypes};
use crate::sbom::{SbomFormat, SyftArtifact, SyftDependency, SyftLocation};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the toolchain binary inside `bin/`
pub const BINARY_NAME: &str = "scarb";

/// Value of the process flag that enables the launch process
pub const RUN_ENABLED: &str = "true";

const FOUND_BY: &str = "scarb-buildpack";
const DEFAULT_LICENSE: &str = "MIT";

/// Contributor for the Scarb layer
#[derive(Debug, Clone)]
pub struct Scarb {
    /// Version declared by the selected dependency
    pub version: String,
    contributor: DependencyLayerContributor,
}

impl Scarb {
    pub fn new(dependency: BuildpackDependency, types: LayerTypes) -> Self {
        Self {
            version: dependency.version.clone(),
            contributor: DependencyLayerContributor::new(dependency, types),
        }
    }

    /// Layer name this contributor owns
    pub fn name(&self) -> &str {
        self.contributor.layer_name()
    }

    /// Install Scarb into `layer` unless it already holds this release
    pub async fn contribute(
        &self,
        layer: Layer,
        resolver: &dyn DependencyResolver,
        executor: &dyn Executor,
    ) -> ScarbResult<Layer> {
        let (mut layer, outcome) = self
            .contributor
            .contribute(layer, resolver, |artifact, layer| {
                self.install(artifact, layer, executor)
            })
            .await?;

        if outcome == CacheOutcome::Hit {
            layer.prepend_path(layer.bin_dir());
        }
        Ok(layer)
    }

    async fn install(
        &self,
        artifact: PathBuf,
        mut layer: Layer,
        executor: &dyn Executor,
    ) -> ScarbResult<Layer> {
        info!("Expanding {} to {}", artifact.display(), layer.path.display());
        archive::extract_async(artifact.clone(), layer.path.clone(), 1).await?;

        let binary = layer.bin_dir().join(BINARY_NAME);
        make_executable(&binary).await?;
        layer.prepend_path(layer.bin_dir());

        let version = self.check_version(&layer, &binary, executor).await?;
        info!("Checking {} version: {}", binary.display(), version);

        let sbom_path = layer.sbom_path(SbomFormat::SyftJson);
        let sbom = SyftDependency::new(&layer.path, vec![self.sbom_artifact(&version)]);
        debug!("Writing Syft SBOM at {}: {:?}", sbom_path.display(), sbom);
        sbom.write_to(&sbom_path).await?;

        Ok(layer)
    }

    /// Run `scarb -V` from the layer and parse the reported version
    async fn check_version(
        &self,
        layer: &Layer,
        binary: &Path,
        executor: &dyn Executor,
    ) -> ScarbResult<String> {
        let execution = Execution {
            command: binary.to_path_buf(),
            args: vec!["-V".to_string()],
            env: vec![("PATH".to_string(), child_path(&layer.path_prepend)?)],
        };

        let output = executor.execute(&execution).await?;
        if !output.success() {
            return Err(ScarbError::VersionCheckExit {
                command: execution.display(),
                code: output.code.unwrap_or(-1),
                output: output.combined,
            });
        }

        parse_version(&output.combined)
    }

    fn sbom_artifact(&self, version: &str) -> SyftArtifact {
        let dependency = self.contributor.dependency();
        let licenses = if dependency.licenses.is_empty() {
            vec![DEFAULT_LICENSE.to_string()]
        } else {
            dependency.licenses.iter().map(|l| l.kind.clone()).collect()
        };

        SyftArtifact {
            id: BINARY_NAME.to_string(),
            name: "Scarb".to_string(),
            version: version.to_string(),
            kind: "UnknownPackage".to_string(),
            found_by: FOUND_BY.to_string(),
            locations: vec![SyftLocation {
                path: format!("bin/{}", BINARY_NAME),
            }],
            licenses,
            language: String::new(),
            cpes: vec![format!("cpe:2.3:a:scarb:scarb:{}:*:*:*:*:*:*:*", version)],
            purl: format!("pkg:generic/scarb@{}", version),
        }
    }

    /// Launch processes for the image; only `"true"` enables `scarb build`
    pub fn build_process_types(&self, run_enable: &str) -> Vec<Process> {
        let mut processes = Vec::new();
        if run_enable == RUN_ENABLED {
            processes.push(Process {
                kind: "web".to_string(),
                command: BINARY_NAME.to_string(),
                args: vec!["build".to_string()],
                default: false,
            });
        }
        processes
    }
}

/// Extract the version from `scarb -V` output.
///
/// Scarb prints `scarb <version> (<commit> <date>)`. The second token is
/// used when it is a semantic version; otherwise the first token anywhere in
/// the output that parses as one.
pub fn parse_version(output: &str) -> ScarbResult<String> {
    let as_semver = |token: &str| {
        let token = token.trim_start_matches('v');
        semver::Version::parse(token)
            .ok()
            .map(|_| token.to_string())
    };

    let trimmed = output.trim();
    let second = trimmed.split_whitespace().nth(1).and_then(as_semver);
    second
        .or_else(|| trimmed.split_whitespace().find_map(as_semver))
        .ok_or_else(|| ScarbError::VersionParse {
            output: trimmed.to_string(),
        })
}

#[cfg(unix)]
async fn make_executable(binary: &Path) -> ScarbResult<()> {
    use std::os::unix::fs::PermissionsExt;

    let perms = std::fs::Permissions::from_mode(0o755);
    tokio::fs::set_permissions(binary, perms)
        .await
        .map_err(|e| ScarbError::io(format!("unable to chmod {}", binary.display()), e))
}

#[cfg(not(unix))]
async fn make_executable(binary: &Path) -> ScarbResult<()> {
    tokio::fs::metadata(binary)
        .await
        .map(|_| ())
        .map_err(|e| ScarbError::io(format!("unable to find {}", binary.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::tarball;
    use crate::exec::{CommandExecutor, ExecOutput};
    use crate::layer::contributor::tests::{dependency, CountingResolver};
    use crate::layer::Layers;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Executor returning canned output and counting calls
    struct FakeExecutor {
        output: ExecOutput,
        calls: AtomicUsize,
    }

    impl FakeExecutor {
        fn new(code: i32, combined: &str) -> Self {
            Self {
                output: ExecOutput {
                    code: Some(code),
                    combined: combined.to_string(),
                },
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Executor for FakeExecutor {
        async fn execute(&self, _execution: &Execution) -> ScarbResult<ExecOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output.clone())
        }
    }

    const SCARB_SCRIPT: &[u8] = b"#!/bin/sh\necho \"scarb 2.3.0 (f7a7b2c0a 2023-10-10)\"\necho \"cairo: 2.3.0 (https://crates.io/crates/cairo-lang-compiler/2.3.0)\"\n";

    fn write_artifact(dir: &Path) -> PathBuf {
        let artifact = dir.join("scarb-v2.3.0-x86_64-unknown-linux-gnu.tar.gz");
        std::fs::write(
            &artifact,
            tarball(
                &[
                    ("scarb-v2.3.0-x86_64-unknown-linux-gnu/bin/scarb", SCARB_SCRIPT, 0o644),
                    ("scarb-v2.3.0-x86_64-unknown-linux-gnu/doc/LICENSE", b"MIT", 0o644),
                ],
                true,
            ),
        )
        .unwrap();
        artifact
    }

    #[test]
    fn parses_second_token() {
        assert_eq!(
            parse_version("scarb 2.3.0 (f7a7b2c0a 2023-10-10)\n").unwrap(),
            "2.3.0"
        );
        assert_eq!(parse_version("  tool 2.3.0  ").unwrap(), "2.3.0");
    }

    #[test]
    fn parses_prerelease_and_v_prefix() {
        assert_eq!(
            parse_version("scarb v2.4.0-rc.1 (abc 2023-11-01)").unwrap(),
            "2.4.0-rc.1"
        );
    }

    #[test]
    fn falls_back_to_any_semver_token() {
        assert_eq!(
            parse_version("Scarb version 2.5.1 (abc 2024-01-01)").unwrap(),
            "2.5.1"
        );
    }

    #[test]
    fn unparseable_output_is_an_error() {
        let err = parse_version("command not found").unwrap_err();
        assert!(matches!(err, ScarbError::VersionParse { .. }));
        assert!(parse_version("").is_err());
    }

    #[test]
    fn process_types_enabled() {
        let scarb = Scarb::new(dependency("aaa"), LayerTypes::all());
        let processes = scarb.build_process_types("true");

        assert_eq!(processes.len(), 1);
        assert_eq!(processes[0].kind, "web");
        assert_eq!(processes[0].command, "scarb");
        assert_eq!(processes[0].args, vec!["build".to_string()]);
    }

    #[test]
    fn process_types_disabled() {
        let scarb = Scarb::new(dependency("aaa"), LayerTypes::all());
        assert!(scarb.build_process_types("false").is_empty());
        assert!(scarb.build_process_types("TRUE").is_empty());
        assert!(scarb.build_process_types("").is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn installs_executable_binary_and_sbom() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let artifact = write_artifact(temp.path());
        let layers_dir = temp.path().join("layers");
        std::fs::create_dir_all(&layers_dir).unwrap();

        let scarb = Scarb::new(dependency("aaa"), LayerTypes::all());
        let resolver = CountingResolver::new(artifact);
        let layer = Layers::new(&layers_dir).layer(scarb.name()).await.unwrap();

        let layer = scarb
            .contribute(layer, &resolver, &CommandExecutor)
            .await
            .unwrap();

        let binary = layers_dir.join("scarb/bin/scarb");
        let mode = std::fs::metadata(&binary).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        assert_eq!(layer.path_prepend, vec![layers_dir.join("scarb/bin")]);
        assert_eq!(layer.types, LayerTypes::all());
        assert_eq!(
            std::fs::read_to_string(layers_dir.join("scarb/env/PATH.prepend")).unwrap(),
            layers_dir.join("scarb/bin").display().to_string()
        );

        let sbom: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(layers_dir.join("scarb.sbom.syft.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(sbom["Artifacts"][0]["Version"], "2.3.0");
        assert_eq!(sbom["Artifacts"][0]["Name"], "Scarb");
        assert_eq!(
            sbom["Artifacts"][0]["CPEs"][0],
            "cpe:2.3:a:scarb:scarb:2.3.0:*:*:*:*:*:*:*"
        );
        assert_eq!(sbom["Artifacts"][0]["PURL"], "pkg:generic/scarb@2.3.0");
        assert_eq!(sbom["Artifacts"][0]["Licenses"][0], "MIT");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn second_build_is_a_cache_hit() {
        let temp = TempDir::new().unwrap();
        let artifact = write_artifact(temp.path());
        let layers_dir = temp.path().join("layers");
        std::fs::create_dir_all(&layers_dir).unwrap();
        let layers = Layers::new(&layers_dir);

        let scarb = Scarb::new(dependency("aaa"), LayerTypes::all());
        let resolver = CountingResolver::new(artifact);
        let layer = layers.layer(scarb.name()).await.unwrap();
        scarb
            .contribute(layer, &resolver, &CommandExecutor)
            .await
            .unwrap();

        let binary = layers_dir.join("scarb/bin/scarb");
        let sbom = layers_dir.join("scarb.sbom.syft.json");
        let binary_mtime = std::fs::metadata(&binary).unwrap().modified().unwrap();
        let sbom_mtime = std::fs::metadata(&sbom).unwrap().modified().unwrap();

        let executor = FakeExecutor::new(0, "scarb 9.9.9");
        let restored = layers.layer(scarb.name()).await.unwrap();
        let layer = scarb
            .contribute(restored, &resolver, &executor)
            .await
            .unwrap();

        assert_eq!(resolver.calls(), 1);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::metadata(&binary).unwrap().modified().unwrap(), binary_mtime);
        assert_eq!(std::fs::metadata(&sbom).unwrap().modified().unwrap(), sbom_mtime);
        assert_eq!(layer.path_prepend, vec![layers_dir.join("scarb/bin")]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_upgrade_is_not_reused_as_previous_release() {
        let temp = TempDir::new().unwrap();
        let artifact = write_artifact(temp.path());
        let layers_dir = temp.path().join("layers");
        std::fs::create_dir_all(&layers_dir).unwrap();
        let layers = Layers::new(&layers_dir);
        let resolver = CountingResolver::new(artifact);

        let current = Scarb::new(dependency("aaa"), LayerTypes::all());
        let layer = layers.layer(current.name()).await.unwrap();
        current
            .contribute(layer, &resolver, &CommandExecutor)
            .await
            .unwrap();

        let upgrade = Scarb::new(dependency("bbb"), LayerTypes::all());
        let broken = FakeExecutor::new(1, "error: unsupported platform");
        let layer = layers.layer(upgrade.name()).await.unwrap();
        assert!(upgrade.contribute(layer, &resolver, &broken).await.is_err());

        let layer = layers.layer(current.name()).await.unwrap();
        current
            .contribute(layer, &resolver, &CommandExecutor)
            .await
            .unwrap();

        assert_eq!(resolver.calls(), 3);
        assert!(layers_dir.join("scarb/bin/scarb").is_file());
        assert!(layers_dir.join("scarb.sbom.syft.json").is_file());
    }

    #[tokio::test]
    async fn failed_version_check_writes_no_sbom() {
        let temp = TempDir::new().unwrap();
        let artifact = write_artifact(temp.path());
        let layers_dir = temp.path().join("layers");
        std::fs::create_dir_all(&layers_dir).unwrap();

        let scarb = Scarb::new(dependency("aaa"), LayerTypes::all());
        let resolver = CountingResolver::new(artifact);
        let executor = FakeExecutor::new(1, "error: unsupported platform");
        let layer = Layers::new(&layers_dir).layer(scarb.name()).await.unwrap();

        let err = scarb
            .contribute(layer, &resolver, &executor)
            .await
            .unwrap_err();

        assert!(err.is_verification());
        assert!(err.to_string().contains("unsupported platform"));
        assert!(!layers_dir.join("scarb.sbom.syft.json").exists());
        assert!(!layers_dir.join("scarb.toml").exists());
    }

    #[tokio::test]
    async fn unparseable_version_writes_no_sbom() {
        let temp = TempDir::new().unwrap();
        let artifact = write_artifact(temp.path());
        let layers_dir = temp.path().join("layers");
        std::fs::create_dir_all(&layers_dir).unwrap();

        let scarb = Scarb::new(dependency("aaa"), LayerTypes::all());
        let resolver = CountingResolver::new(artifact);
        let executor = FakeExecutor::new(0, "scarb unknown");
        let layer = Layers::new(&layers_dir).layer(scarb.name()).await.unwrap();

        let err = scarb
            .contribute(layer, &resolver, &executor)
            .await
            .unwrap_err();

        assert!(matches!(err, ScarbError::VersionParse { .. }));
        assert!(!layers_dir.join("scarb.sbom.syft.json").exists());
    }

    #[tokio::test]
    async fn missing_binary_fails_activation() {
        let temp = TempDir::new().unwrap();
        let artifact = temp.path().join("empty.tar.gz");
        std::fs::write(&artifact, tarball(&[("top/README", b"nothing", 0o644)], true)).unwrap();
        let layers_dir = temp.path().join("layers");
        std::fs::create_dir_all(&layers_dir).unwrap();

        let scarb = Scarb::new(dependency("aaa"), LayerTypes::all());
        let resolver = CountingResolver::new(artifact);
        let executor = FakeExecutor::new(0, "scarb 2.3.0");
        let layer = Layers::new(&layers_dir).layer(scarb.name()).await.unwrap();

        let err = scarb
            .contribute(layer, &resolver, &executor)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("bin/scarb"));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    }
}
