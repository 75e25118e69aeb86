//! Human and JSON output modes, version and completions.

use assert_cmd::Command;
use predicates::prelude::*;

use crate::common::cli::CliRunner;

fn loopdeck() -> Command {
    let mut cmd = Command::cargo_bin("loopdeck").unwrap();
    cmd.env("RUST_LOG", "off").env("NO_COLOR", "1");
    cmd
}

#[test]
fn quick_start_without_command() {
    loopdeck()
        .assert()
        .success()
        .stdout(predicate::str::contains("QUICK START"))
        .stdout(predicate::str::contains("loopdeck trigger"));
}

#[test]
fn version_human_and_json() {
    loopdeck()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("loopdeck "));

    let cli = CliRunner::new();
    let json = cli.run_json(&["version"]).json();
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert!(json.get("target").is_some());
}

#[test]
fn json_env_switches_output() {
    let cli = CliRunner::new().with_env("LOOPDECK_JSON", "true");
    let result = cli.run(&["check"]);
    result.assert_success();
    assert!(result.json().get("issues").is_some());
}

#[test]
fn completions_for_bash() {
    loopdeck()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("loopdeck"));
}

#[test]
fn exec_rejects_unknown_action_type() {
    let cli = CliRunner::new();
    cli.run(&["exec", "teleport", "now"])
        .assert_failure()
        .assert_stderr_contains("Unknown action type");
}

#[test]
fn exec_failure_exits_nonzero_with_reason() {
    let cli = CliRunner::new();
    let result = cli.run_json(&["exec", "url", "ftp://nope"]);
    result.assert_failure();
    assert_eq!(result.json()["reason"], "Invalid URL (http/https only)");
}
