//! Test support utilities for warren integration tests.
//!
//! Provides an isolated test environment and helper commands.

#![allow(dead_code)]

pub mod assertions;

#[allow(unused_imports)]
pub use assertions::*;

use std::fs;
use std::process::Output;

use assert_cmd::Command;
use tempfile::TempDir;

/// Default service URL for tests: nothing listens there, so every request
/// fails fast with a connection error instead of reaching a real host.
pub const UNREACHABLE_API: &str = "http://127.0.0.1:9";

/// Test environment with isolated temp directories.
///
/// Each test gets its own temporary project dir and home dir.
/// No process-global state is mutated; child processes use `.current_dir()`
/// so tests can safely run in parallel.
pub struct Test {
    /// Temporary directory for the test project
    pub dir: TempDir,
    /// Temporary home directory
    pub home: TempDir,
}

impl Test {
    /// Create a new empty test environment.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let home = TempDir::new().expect("failed to create temp home");

        Self { dir, home }
    }

    /// Create a test environment linked to a repository vault.
    pub fn init(repo: &str) -> Self {
        let t = Self::new();
        let output = t.init_cmd(repo);
        assert!(
            output.status.success(),
            "failed to initialize: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        t
    }

    /// Create a warren command with correct environment variables.
    ///
    /// Returns a Command configured with:
    /// - HOME/USERPROFILE set to the temporary home directory
    /// - Current directory set to the test project directory
    /// - The service URL pointed at an unreachable address
    /// - No inherited credential or CI markers
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("warren").expect("failed to find warren binary");
        cmd.env("HOME", self.home.path());
        // Windows uses USERPROFILE instead of HOME for home directory
        cmd.env("USERPROFILE", self.home.path());
        cmd.env("WARREN_API_URL", UNREACHABLE_API);
        cmd.env_remove("WARREN_TOKEN");
        cmd.env_remove("CI");
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Shortcut for `warren init --repo <repo>`.
    pub fn init_cmd(&self, repo: &str) -> Output {
        self.cmd()
            .args(["init", "--repo", repo])
            .output()
            .expect("failed to run warren init")
    }

    /// Write the local secret file in the project directory.
    pub fn write_env_file(&self, content: &str) {
        fs::write(self.dir.path().join(".env"), content).expect("failed to write .env");
    }

    /// Read a file from the project directory.
    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.dir.path().join(name)).expect("failed to read file")
    }

    /// Whether a file exists in the project directory.
    pub fn exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }
}
