//! Behavioural smoke tests for the CLI entrypoint.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::str::contains;

#[test]
fn help_lists_lifecycle_commands() {
    let mut cmd = cargo_bin_cmd!("e24cloud-driver");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(contains("create"))
        .stdout(contains("templates"));
}

#[test]
fn bare_invocation_prints_usage() {
    let mut cmd = cargo_bin_cmd!("e24cloud-driver");
    cmd.assert().failure().stderr(contains("Usage"));
}

#[test]
fn unknown_region_is_reported_without_network() {
    let mut cmd = cargo_bin_cmd!("e24cloud-driver");
    cmd.env("E24CLOUD_API_KEY", "key")
        .env("E24CLOUD_API_SECRET", "secret")
        .env("E24CLOUD_REGION", "eu-mars-1")
        .arg("regions")
        .assert()
        .failure()
        .stderr(contains("E24CLOUD_REGION"));
}
