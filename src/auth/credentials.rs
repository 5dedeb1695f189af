//! Credential storage.
//!
//! The bearer token lives in the OS-native credential store (Keychain,
//! Credential Manager, keyutils) under a single service entry. CI can bypass
//! the keychain entirely with `WARREN_TOKEN`.

use tracing::{debug, info};

use crate::core::constants;
use crate::error::{AuthError, Result};

/// Secure storage for the bearer credential.
pub trait CredentialStore: Send + Sync {
    /// Persist a token, replacing any existing one.
    fn store(&self, token: &str) -> Result<()>;

    /// Load the stored token, if any.
    fn load(&self) -> Result<Option<String>>;

    /// Delete the stored token. Deleting an absent token is not an error.
    fn delete(&self) -> Result<()>;
}

/// OS keychain backend.
pub struct Keyring {
    service: String,
    account: String,
}

impl Keyring {
    const SERVICE_NAME: &'static str = "dev.warren.cli";
    const ACCOUNT: &'static str = "token";

    pub fn new() -> Self {
        Self {
            service: Self::SERVICE_NAME.to_string(),
            account: Self::ACCOUNT.to_string(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, &self.account)
            .map_err(|e| AuthError::Store(e.to_string()).into())
    }
}

impl Default for Keyring {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for Keyring {
    fn store(&self, token: &str) -> Result<()> {
        self.entry()?
            .set_password(token)
            .map_err(|e| AuthError::Store(e.to_string()))?;
        info!("credential stored in OS keychain");
        Ok(())
    }

    fn load(&self) -> Result<Option<String>> {
        // An environment token takes precedence so CI never touches the
        // keychain, and a headless host without one still works.
        if let Ok(token) = std::env::var(constants::TOKEN_ENV_VAR) {
            if !token.is_empty() {
                debug!("using token from {}", constants::TOKEN_ENV_VAR);
                return Ok(Some(token));
            }
        }

        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(keyring::Error::PlatformFailure(e)) => {
                debug!(error = %e, "keychain unavailable, treating as no credential");
                Ok(None)
            }
            Err(e) => Err(AuthError::Store(e.to_string()).into()),
        }
    }

    fn delete(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) => {
                info!("credential removed from OS keychain");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(AuthError::Store(e.to_string()).into()),
        }
    }
}

/// In-memory store for tests.
#[cfg(test)]
pub struct MemoryStore {
    token: std::sync::Mutex<Option<String>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new(token: Option<&str>) -> Self {
        Self {
            token: std::sync::Mutex::new(token.map(String::from)),
        }
    }
}

#[cfg(test)]
impl CredentialStore for MemoryStore {
    fn store(&self, token: &str) -> Result<()> {
        *self.token.lock().unwrap() = Some(token.to_string());
        Ok(())
    }

    fn load(&self) -> Result<Option<String>> {
        Ok(self.token.lock().unwrap().clone())
    }

    fn delete(&self) -> Result<()> {
        *self.token.lock().unwrap() = None;
        Ok(())
    }
}
