//! CLI argument parsing tests.

#![allow(deprecated)] // Command::cargo_bin is deprecated but replacement requires newer assert_cmd

use assert_cmd::Command;
use predicates::prelude::*;

fn umbra() -> Command {
    Command::cargo_bin("umbra").unwrap()
}

#[test]
fn version_command_succeeds() {
    umbra()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("umbra"));
}

#[test]
fn version_flag_shows_version() {
    umbra()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn help_lists_subcommands() {
    umbra()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("qualifiers"))
        .stdout(predicate::str::contains("gates"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn qualifiers_requires_an_argument() {
    umbra()
        .arg("qualifiers")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn api_level_must_be_numeric() {
    umbra()
        .args(["gates", "--api-level", "kitkat"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn unknown_format_is_rejected() {
    umbra()
        .args(["config", "--format", "yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("possible values"));
}
