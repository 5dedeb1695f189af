//! Tests for `warren run`.

mod support;
use support::{assert_exit_code, assert_stderr_contains, assert_stdout_contains, Test};

#[test]
fn run_with_no_command_fails() {
    let t = Test::init("acme/api");

    let output = t.cmd().arg("run").output().unwrap();
    assert_exit_code(&output, 1);
    assert_stderr_contains(&output, "no command");
}

#[test]
fn run_without_init_fails() {
    let t = Test::new();

    let output = t.cmd().args(["run", "env"]).output().unwrap();
    assert_exit_code(&output, 1);
    assert_stdout_contains(&output, "warren init");
}

#[test]
fn run_without_credential_requires_auth() {
    let t = Test::init("acme/api");

    let output = t.cmd().args(["run", "env"]).output().unwrap();
    assert_exit_code(&output, 2);
    assert_stdout_contains(&output, "warren login");
}
