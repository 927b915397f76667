//! Binary exit codes and messages.

use assert_cmd::Command;
use predicates::prelude::*;

fn bundle_cmd() -> Command {
    let mut cmd = Command::cargo_bin("agentuity-bundle").unwrap();
    cmd.env_remove("AGENTUITY_PROJECT_DIR")
        .env_remove("AGENTUITY_BUNDLER_HOST")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_bundle_flags() {
    bundle_cmd()
        .args(["bundle", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--install"))
        .stdout(predicate::str::contains("--production"))
        .stdout(predicate::str::contains("--ci"))
        .stdout(predicate::str::contains("--dir"));
}

#[test]
fn missing_directory_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    bundle_cmd()
        .args(["bundle", "--dir"])
        .arg(dir.path().join("nope"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("project directory not found"));
}

#[test]
fn directory_without_project_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    bundle_cmd()
        .arg("bundle")
        .env("AGENTUITY_PROJECT_DIR", dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("agentuity.yaml"))
        .stderr(predicate::str::contains("pass --dir"));
    assert!(!dir.path().join(".agentuity").exists());
}

#[test]
fn unsupported_runtime_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("agentuity.yaml"),
        "project_id: p\nbundler:\n  language: javascript\n  runtime: deno\n",
    )
    .unwrap();
    bundle_cmd()
        .args(["bundle", "--dir"])
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unsupported runtime: deno"));
}

#[test]
fn unknown_log_level_is_a_usage_error() {
    bundle_cmd()
        .args(["bundle", "--log-level", "loud"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--log-level"));
}
