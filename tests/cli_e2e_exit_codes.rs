//! End-to-end tests for CLI exit codes.
//!
//! - Exit code 0: Success
//! - Exit code 1: General error
//! - Exit code 2: Invalid command-line usage (clap), or partial failure for
//!   `update-latest`
//! - Exit code 3: Fatal error in `update-latest`

mod common;
use common::prelude::*;

#[test]
fn test_exit_code_help() {
    let mut cmd = cargo_bin_cmd!("known-good");
    cmd.arg("--help").assert().code(0);
}

#[test]
fn test_exit_code_version() {
    let mut cmd = cargo_bin_cmd!("known-good");
    cmd.arg("--version")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("known-good"));
}

#[test]
fn test_exit_code_unknown_subcommand() {
    let mut cmd = cargo_bin_cmd!("known-good");
    cmd.arg("frobnicate").assert().code(2);
}

#[test]
fn test_exit_code_missing_registry() {
    let fixture = TestFixture::new();

    fixture
        .command()
        .args(["workspace", "--known-good", "nonexistent.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ERROR: Failed to load nonexistent.json"));
}

#[test]
fn test_exit_code_invalid_json_points_at_error() {
    let fixture = TestFixture::new().with_registry(registries::TRAILING_COMMA);

    fixture
        .command()
        .arg("generate")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid JSON at line 5"))
        .stderr(predicate::str::contains("trailing comma"));
}

#[test]
fn test_exit_code_wrong_shape() {
    let fixture = TestFixture::new().with_registry(r#"{"modules": []}"#);

    fixture
        .command()
        .arg("workspace")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid registry structure"));
}

#[test]
fn test_invalid_log_level_is_usage_error() {
    let fixture = TestFixture::new().with_registry(registries::SAMPLE);

    fixture
        .command()
        .args(["--log-level", "loud", "workspace"])
        .assert()
        .code(2);
}

#[test]
fn test_log_level_error_hides_info_logs() {
    let fixture = TestFixture::new().with_registry(registries::SAMPLE);

    fixture
        .command()
        .args(["--log-level", "error", "workspace"])
        .assert()
        .success()
        .stderr(predicate::str::contains("INFO:").not());
}
