//! Black-box tests against the compiled `crucible` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn crucible() -> Command {
    Command::cargo_bin("crucible").unwrap()
}

#[test]
fn no_subcommand_prints_help_and_fails() {
    crucible()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_lists_all_three_verbs() {
    crucible()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("push"))
        .stdout(predicate::str::contains("run"));
}

#[test]
fn run_help_lists_search_and_format_flags() {
    crucible()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--search"))
        .stdout(predicate::str::contains("--format"))
        .stdout(predicate::str::contains("--no-validate"));
}

#[test]
fn unknown_subcommand_fails_with_clap_usage_error() {
    crucible()
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized"));
}

#[test]
fn run_against_unreachable_docker_daemon_reports_json_error() {
    let dir = tempfile::tempdir().unwrap();
    crucible()
        .args(["--format", "json", "run"])
        .arg(dir.path())
        .env("DOCKER_HOST", "tcp://127.0.0.1:1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"name\""));
}
