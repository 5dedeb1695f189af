//! Init command - link the working copy to a repository vault.

use crate::cli::output;
use crate::core::config::{self, Config};
use crate::core::reference::RepoSlug;
use crate::error::{ConfigError, Result};

/// Write `.warren.toml` for this directory.
pub fn execute(repo: Option<String>) -> Result<()> {
    if Config::exists() {
        return Err(ConfigError::AlreadyInitialized.into());
    }

    let slug = match repo {
        Some(s) => RepoSlug::parse(&s)?,
        None => RepoSlug::detect().ok_or(ConfigError::NoRepository)?,
    };

    let config = Config::new(&slug);
    config.save()?;
    config::ensure_gitignore()?;

    output::success("linked");
    output::kv("repo", &slug);
    output::kv("config", ".warren.toml (commit this)");
    println!();
    output::hint("next: warren login, then warren pull");

    Ok(())
}
