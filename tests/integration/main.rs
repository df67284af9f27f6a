//! Integration tests for gsbuild

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn gsbuild() -> Command {
        let mut cmd = cargo_bin_cmd!("gsbuild");
        cmd.env_remove("GSBUILD_CONFIG");
        cmd
    }

    fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("gsbuild.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn help_displays() {
        gsbuild()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Standalone Ghostscript builder"))
            .stdout(predicate::str::contains("--no-ram-disk"));
    }

    #[test]
    fn version_displays() {
        gsbuild()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("gsbuild"));
    }

    #[test]
    fn cleanup_flags_conflict() {
        gsbuild()
            .args(["--cleanup", "--no-cleanup"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("cannot be used with"));
    }

    #[test]
    fn missing_config_file_fails() {
        let dir = TempDir::new().unwrap();
        gsbuild()
            .current_dir(dir.path())
            .arg("--config")
            .arg(dir.path().join("absent.toml"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Configuration file not found"));
    }

    #[test]
    fn invalid_config_file_fails() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, "[build]\nmax_jobs = \"many\"\n");

        gsbuild()
            .current_dir(dir.path())
            .arg("--config")
            .arg(&config)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn missing_tools_fail_before_anything_is_written() {
        let dir = TempDir::new().unwrap();
        let config = write_config(
            &dir,
            "[build]\nrequired_tools = [\"gsbuild-test-no-such-tool\"]\n\n[cache]\nenabled = false\n",
        );

        gsbuild()
            .current_dir(dir.path())
            .env("GSBUILD_CONFIG", &config)
            .arg("--no-ram-disk")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Missing required tools: gsbuild-test-no-such-tool"))
            .stderr(predicate::str::contains("Hint:"));

        assert!(!dir.path().join("build").exists());
        assert!(!dir.path().join("bin").exists());
    }
}
