//! Tests for `warren init`.

mod support;
use support::{assert_failure, assert_stderr_contains, assert_success, stdout, Test};

#[test]
fn init_writes_config_and_gitignore() {
    let t = Test::new();

    let output = t.init_cmd("acme/api");
    assert_success(&output);
    assert!(stdout(&output).contains("acme/api"));

    assert!(t.exists(".warren.toml"), ".warren.toml should exist");
    let config = t.read(".warren.toml");
    assert!(config.contains("acme/api"));
    assert!(config.contains("version"));

    // The secret file must never be committable by accident.
    let gitignore = t.read(".gitignore");
    assert!(gitignore.contains(".env"));
}

#[test]
fn init_twice_fails() {
    let t = Test::init("acme/api");

    let output = t.init_cmd("acme/api");
    assert_failure(&output);
    assert_stderr_contains(&output, "already linked");
}

#[test]
fn init_rejects_malformed_slug() {
    let t = Test::new();

    let output = t.init_cmd("not-a-slug");
    assert_failure(&output);
    assert_stderr_contains(&output, "owner/repo");
}

#[test]
fn init_without_repo_or_remote_fails() {
    let t = Test::new();

    // Temp dir has no git remote to detect.
    let output = t.cmd().arg("init").output().unwrap();
    assert_failure(&output);
    assert_stderr_contains(&output, "repository");
}

#[test]
fn init_appends_to_existing_gitignore() {
    let t = Test::new();
    std::fs::write(t.dir.path().join(".gitignore"), "target/\n").unwrap();

    let output = t.init_cmd("acme/api");
    assert_success(&output);

    let gitignore = t.read(".gitignore");
    assert!(gitignore.contains("target/"), "existing entries kept");
    assert!(gitignore.contains(".env"));
}
