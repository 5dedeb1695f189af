//! Vault addressing.
//!
//! A [`VaultRef`] names the remote secret set a command targets:
//! `(owner, repo, environment)`. The repository half can be detected from
//! the git remote when not configured.

use std::fmt;
use std::process::Command;

use tracing::debug;

use crate::core::constants;
use crate::core::validation;
use crate::error::{Result, ValidationError};

/// A GitHub repository slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

impl RepoSlug {
    /// Parse an `owner/repo` string.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
                Ok(Self {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                })
            }
            _ => Err(ValidationError::InvalidRepository(s.to_string()).into()),
        }
    }

    /// Detect the slug from the `origin` git remote, if any.
    ///
    /// Handles both SSH (`git@github.com:owner/repo.git`) and HTTPS
    /// (`https://github.com/owner/repo.git`) remote forms.
    pub fn detect() -> Option<Self> {
        let output = Command::new("git")
            .args(["config", "--get", "remote.origin.url"])
            .output()
            .ok()?;

        if !output.status.success() {
            return None;
        }

        let url = String::from_utf8(output.stdout).ok()?;
        let slug = parse_github_remote(url.trim())?;
        debug!(owner = %slug.owner, repo = %slug.repo, "detected repository from git remote");
        Some(slug)
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Which remote secret set a command targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultRef {
    pub slug: RepoSlug,
    pub environment: String,
}

impl VaultRef {
    /// Build a reference, defaulting the environment to `development`.
    pub fn new(slug: RepoSlug, environment: Option<&str>) -> Result<Self> {
        let environment = environment
            .unwrap_or(constants::DEFAULT_ENVIRONMENT)
            .to_string();
        validation::validate_environment(&environment)?;
        Ok(Self { slug, environment })
    }

    /// The same repository, addressing a different environment.
    pub fn with_environment(&self, environment: &str) -> Result<Self> {
        validation::validate_environment(environment)?;
        Ok(Self {
            slug: self.slug.clone(),
            environment: environment.to_string(),
        })
    }
}

impl fmt::Display for VaultRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.slug, self.environment)
    }
}

/// Extract `owner/repo` from a GitHub remote URL.
fn parse_github_remote(url: &str) -> Option<RepoSlug> {
    let path = if let Some(rest) = url.strip_prefix("git@github.com:") {
        rest
    } else if let Some(rest) = url
        .strip_prefix("https://github.com/")
        .or_else(|| url.strip_prefix("http://github.com/"))
        .or_else(|| url.strip_prefix("ssh://git@github.com/"))
    {
        rest
    } else {
        return None;
    };

    let path = path.strip_suffix(".git").unwrap_or(path);
    RepoSlug::parse(path.trim_end_matches('/')).ok()
}
