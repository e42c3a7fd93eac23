//! Integration tests for the Scarb buildpack

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn buildpack() -> Command {
        let mut cmd = cargo_bin_cmd!("scarb-buildpack");
        for var in [
            "CNB_APP_DIR",
            "CNB_LAYERS_DIR",
            "CNB_BUILDPACK_DIR",
            "CNB_BUILD_PLAN_PATH",
            "CNB_BP_PLAN_PATH",
            "BP_SCARB_VERSION",
            "BP_ENABLE_SCARB_PROCESS",
            "BP_DEPENDENCY_CACHE",
            "BP_DOWNLOAD_DIR",
            "BP_LOG_LEVEL",
        ] {
            cmd.env_remove(var);
        }
        cmd
    }

    #[test]
    fn help_displays() {
        buildpack()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Scarb toolchain"));
    }

    #[test]
    fn version_displays() {
        buildpack()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("scarb-buildpack"));
    }

    #[test]
    fn detect_passes_and_writes_plan() {
        let app = TempDir::new().unwrap();
        std::fs::write(app.path().join("Scarb.toml"), "[package]\nname = \"hello\"\n").unwrap();
        let plan = app.path().join("plan.toml");

        buildpack()
            .arg("detect")
            .arg("--app")
            .arg(app.path())
            .arg("--plan")
            .arg(&plan)
            .assert()
            .success();

        let content = std::fs::read_to_string(plan).unwrap();
        assert!(content.contains("[[provides]]"));
        assert!(content.contains("[[requires]]"));
        assert!(content.contains("name = \"scarb\""));
    }

    #[test]
    fn detect_fails_without_marker() {
        let app = TempDir::new().unwrap();

        buildpack()
            .arg("detect")
            .arg("--app")
            .arg(app.path())
            .assert()
            .code(100);
    }

    #[test]
    fn build_without_dependency_fails() {
        let temp = TempDir::new().unwrap();

        buildpack()
            .arg("build")
            .arg("--layers")
            .arg(temp.path())
            .arg("--buildpack")
            .arg(temp.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("No dependency 'scarb'"));
    }
}

#[cfg(unix)]
mod build_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use sha2::{Digest, Sha256};
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;

    const SCARB_SCRIPT: &[u8] = b"#!/bin/sh\necho \"scarb 2.3.0 (f7a7b2c0a 2023-10-10)\"\n";

    /// Write a release-shaped archive and a descriptor pointing at it
    fn setup_buildpack(dir: &Path) {
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_size(SCARB_SCRIPT.len() as u64);
        header.set_mode(0o644);
        builder
            .append_data(&mut header, "scarb-v2.3.0/bin/scarb", SCARB_SCRIPT)
            .unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&builder.into_inner().unwrap()).unwrap();
        let archive = encoder.finish().unwrap();

        let artifact = dir.join("scarb-v2.3.0.tar.gz");
        std::fs::write(&artifact, &archive).unwrap();
        let sha = hex::encode(Sha256::digest(&archive));

        std::fs::write(
            dir.join("buildpack.toml"),
            format!(
                r#"
api = "0.8"

[buildpack]
id = "scarb-buildpack"
name = "Scarb Buildpack"
version = "0.3.0"

[[metadata.dependencies]]
id = "scarb"
name = "Scarb"
version = "2.3.0"
uri = "file://{}"
sha256 = "{}"
"#,
                artifact.display(),
                sha
            ),
        )
        .unwrap();
    }

    fn build(buildpack_dir: &Path, layers: &Path, downloads: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("scarb-buildpack");
        cmd.env_remove("BP_SCARB_VERSION")
            .env_remove("BP_DEPENDENCY_CACHE")
            .arg("build")
            .arg("--layers")
            .arg(layers)
            .arg("--buildpack")
            .arg(buildpack_dir)
            .arg("--download-dir")
            .arg(downloads);
        cmd
    }

    #[test]
    fn build_installs_scarb_layer() {
        let temp = TempDir::new().unwrap();
        let bp = temp.path().join("buildpack");
        let layers = temp.path().join("layers");
        let downloads = temp.path().join("downloads");
        std::fs::create_dir_all(&bp).unwrap();
        std::fs::create_dir_all(&layers).unwrap();
        setup_buildpack(&bp);

        build(&bp, &layers, &downloads)
            .env("BP_ENABLE_SCARB_PROCESS", "true")
            .assert()
            .success();

        assert!(layers.join("scarb/bin/scarb").is_file());

        let manifest = std::fs::read_to_string(layers.join("scarb.toml")).unwrap();
        assert!(manifest.contains("launch = true"));
        assert!(manifest.contains("version = \"2.3.0\""));

        let sbom = std::fs::read_to_string(layers.join("scarb.sbom.syft.json")).unwrap();
        assert!(sbom.contains("pkg:generic/scarb@2.3.0"));

        let launch = std::fs::read_to_string(layers.join("launch.toml")).unwrap();
        assert!(launch.contains("type = \"web\""));
        assert!(launch.contains("\"build\""));
    }

    #[test]
    fn rebuild_reuses_layer() {
        let temp = TempDir::new().unwrap();
        let bp = temp.path().join("buildpack");
        let layers = temp.path().join("layers");
        let downloads = temp.path().join("downloads");
        std::fs::create_dir_all(&bp).unwrap();
        std::fs::create_dir_all(&layers).unwrap();
        setup_buildpack(&bp);

        build(&bp, &layers, &downloads)
            .env("BP_ENABLE_SCARB_PROCESS", "false")
            .assert()
            .success();
        assert!(!layers.join("launch.toml").exists());

        // Origin and download cache gone: only a cache hit can succeed
        std::fs::remove_file(bp.join("scarb-v2.3.0.tar.gz")).unwrap();
        std::fs::remove_dir_all(&downloads).unwrap();

        build(&bp, &layers, &downloads)
            .arg("-v")
            .assert()
            .success()
            .stdout(predicates::str::contains("Reusing cached layer"));
    }
}
