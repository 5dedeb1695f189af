//! Tests for the CLI surface itself: help, version, completions.

mod support;
use predicates::prelude::*;
use support::{assert_failure, assert_success, Test};

#[test]
fn help_lists_commands() {
    let t = Test::new();

    let mut assert = t.cmd().arg("--help").assert().success();
    for command in ["init", "login", "push", "pull", "diff", "run", "sync"] {
        assert = assert.stdout(predicate::str::contains(command));
    }
}

#[test]
fn version_prints_package_version() {
    let t = Test::new();

    t.cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn completions_generate_for_each_shell() {
    let t = Test::new();

    for shell in ["bash", "zsh", "fish", "power-shell"] {
        let output = t.cmd().args(["completions", shell]).output().unwrap();
        assert_success(&output);
        assert!(
            !output.stdout.is_empty(),
            "no completion script for {}",
            shell
        );
    }
}

#[test]
fn unknown_subcommand_fails() {
    let t = Test::new();

    let output = t.cmd().arg("teleport").output().unwrap();
    assert_failure(&output);
}
