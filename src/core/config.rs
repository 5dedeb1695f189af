//! Configuration file management.
//!
//! Handles reading, writing, and validating `.warren.toml` files that link a
//! working copy to its vault.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::core::constants;
use crate::core::reference::{RepoSlug, VaultRef};
use crate::error::{ConfigError, Result};

/// Project configuration stored in `.warren.toml`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Metadata about the vault link
    pub warren: Meta,
    /// Optional third-party provider link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderLink>,
}

/// Metadata section of the configuration.
#[derive(Debug, Serialize, Deserialize)]
pub struct Meta {
    /// Configuration version
    pub version: String,
    /// Repository slug, `owner/repo`
    pub repo: String,
    /// Default environment name
    #[serde(default)]
    pub environment: Option<String>,
    /// Path of the local secret file
    #[serde(default)]
    pub env_file: Option<String>,
}

/// Association with an external provider's project/environment identity.
///
/// Owned by the vault service; warren only passes it through sync requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderLink {
    /// Provider name as registered with the vault service (e.g. "vercel")
    pub name: String,
    /// Provider-side project identifier
    pub project: String,
    /// Provider-side environment name
    pub environment: String,
}

impl Config {
    /// Create a configuration linking this directory to a repository.
    pub fn new(slug: &RepoSlug) -> Self {
        Self {
            warren: Meta {
                version: env!("CARGO_PKG_VERSION").to_string(),
                repo: slug.to_string(),
                environment: None,
                env_file: None,
            },
            provider: None,
        }
    }

    /// Path to the configuration file in the current directory.
    pub fn config_path() -> PathBuf {
        PathBuf::from(constants::CONFIG_FILE)
    }

    /// Check if a configuration file exists in the current directory.
    pub fn exists() -> bool {
        Self::config_path().exists()
    }

    /// Load configuration from `.warren.toml`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotInitialized` if the file doesn't exist,
    /// or `ConfigError::Parse` if the TOML is malformed.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        debug!(path = %path.display(), "loading config");

        if !path.exists() {
            return Err(ConfigError::NotInitialized.into());
        }
        let contents = std::fs::read_to_string(&path).map_err(ConfigError::ReadFile)?;
        let config: Self = toml::from_str(&contents).map_err(ConfigError::Parse)?;

        // The repo slug must parse; surface bad hand edits early.
        RepoSlug::parse(&config.warren.repo)?;

        Ok(config)
    }

    /// Save configuration to `.warren.toml`.
    pub fn save(&self) -> Result<()> {
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(Self::config_path(), contents).map_err(ConfigError::WriteFile)?;
        Ok(())
    }

    /// The configured repository slug.
    pub fn slug(&self) -> Result<RepoSlug> {
        RepoSlug::parse(&self.warren.repo)
    }

    /// Resolve the vault reference for a command, preferring an explicit
    /// `--env` over the configured default over `development`.
    pub fn vault_ref(&self, env_flag: Option<&str>) -> Result<VaultRef> {
        let environment = env_flag.or(self.warren.environment.as_deref());
        VaultRef::new(self.slug()?, environment)
    }

    /// Path of the local secret file, preferring an explicit `--file`.
    pub fn env_file(&self, file_flag: Option<&str>) -> PathBuf {
        PathBuf::from(
            file_flag
                .or(self.warren.env_file.as_deref())
                .unwrap_or(constants::ENV_FILE),
        )
    }

    /// The provider link, if one is configured.
    pub fn provider(&self) -> Result<&ProviderLink> {
        self.provider
            .as_ref()
            .ok_or_else(|| ConfigError::NoProvider.into())
    }
}

/// Ensure the local secret file patterns are present in `.gitignore`.
pub fn ensure_gitignore() -> Result<()> {
    let path = PathBuf::from(".gitignore");
    let existing = if path.exists() {
        std::fs::read_to_string(&path)?
    } else {
        String::new()
    };

    let mut lines: Vec<&str> = existing.lines().collect();
    let mut changed = false;
    for &entry in constants::GITIGNORE_ENTRIES {
        if !lines.contains(&entry) {
            lines.push(entry);
            changed = true;
        }
    }

    if changed {
        std::fs::write(&path, format!("{}\n", lines.join("\n")))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config::new(&RepoSlug::parse("acme/api").unwrap())
    }

    #[test]
    fn test_round_trip_toml() {
        let mut config = sample();
        config.warren.environment = Some("staging".to_string());
        config.provider = Some(ProviderLink {
            name: "vercel".to_string(),
            project: "prj_123".to_string(),
            environment: "preview".to_string(),
        });

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();

        assert_eq!(parsed.warren.repo, "acme/api");
        assert_eq!(parsed.warren.environment.as_deref(), Some("staging"));
        let link = parsed.provider.unwrap();
        assert_eq!(link.name, "vercel");
        assert_eq!(link.project, "prj_123");
    }

    #[test]
    fn test_vault_ref_resolution_order() {
        let mut config = sample();
        assert_eq!(config.vault_ref(None).unwrap().environment, "development");

        config.warren.environment = Some("staging".to_string());
        assert_eq!(config.vault_ref(None).unwrap().environment, "staging");
        assert_eq!(
            config.vault_ref(Some("production")).unwrap().environment,
            "production"
        );
    }

    #[test]
    fn test_env_file_resolution_order() {
        let mut config = sample();
        assert_eq!(config.env_file(None), PathBuf::from(".env"));

        config.warren.env_file = Some(".env.local".to_string());
        assert_eq!(config.env_file(None), PathBuf::from(".env.local"));
        assert_eq!(config.env_file(Some(".env.ci")), PathBuf::from(".env.ci"));
    }

    #[test]
    fn test_provider_missing() {
        assert!(sample().provider().is_err());
    }
}
