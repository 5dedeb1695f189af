//! Collaborator contracts for the vault service and linked providers.
//!
//! The vault's HTTP implementation, storage, and encryption are external;
//! warren talks to them through these narrow traits so the sync and auth
//! engines can be exercised against in-memory fakes.

pub mod http;

use serde::{Deserialize, Serialize};

use crate::core::reference::VaultRef;
use crate::core::snapshot::Snapshot;
use crate::error::Result;

/// A device code / user code pair issued at flow start.
///
/// Lives only for the duration of the login command; never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceAuthorization {
    pub device_code: String,
    pub user_code: String,
    pub verification_url: String,
    /// Seconds until the device code expires
    pub expires_in: u64,
    /// Initial poll interval in seconds
    pub interval: u64,
}

/// One token-exchange poll result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The user approved; carries the bearer token.
    Authorized(String),
    /// Not approved yet, poll again at the current interval.
    Pending,
    /// Polling too fast; increase the interval before the next attempt.
    SlowDown,
    /// The user rejected the authorization.
    Denied,
    /// The device code expired before approval.
    Expired,
}

/// The authenticated account, as the vault service sees it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Account {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// The remote vault service.
///
/// Implementations must be shareable across the APPLY fan-out threads.
pub trait VaultApi: Send + Sync {
    /// Fetch the full snapshot for one environment.
    fn fetch_snapshot(&self, token: &str, vault: &VaultRef) -> Result<Snapshot>;

    /// Write one key. Idempotent on the server side.
    fn put_key(&self, token: &str, vault: &VaultRef, key: &str, value: &str) -> Result<()>;

    /// Delete one key.
    fn delete_key(&self, token: &str, vault: &VaultRef, key: &str) -> Result<()>;

    /// Start a device authorization.
    fn request_device_code(&self) -> Result<DeviceAuthorization>;

    /// Attempt a token exchange for a pending device code.
    fn exchange_device_code(&self, device_code: &str) -> Result<PollOutcome>;

    /// Identify the account behind a token.
    fn whoami(&self, token: &str) -> Result<Account>;
}

/// A linked third-party provider, reached through the vault service's
/// provider proxy. Same shape as the vault, different failure domain.
pub trait ProviderApi: Send + Sync {
    /// Fetch the provider's current snapshot for the linked project/env.
    fn fetch_snapshot(
        &self,
        token: &str,
        vault: &VaultRef,
        provider: &crate::core::config::ProviderLink,
    ) -> Result<Snapshot>;

    /// Write one key on the provider side.
    fn put_key(
        &self,
        token: &str,
        vault: &VaultRef,
        provider: &crate::core::config::ProviderLink,
        key: &str,
        value: &str,
    ) -> Result<()>;

    /// Delete one key on the provider side.
    fn delete_key(
        &self,
        token: &str,
        vault: &VaultRef,
        provider: &crate::core::config::ProviderLink,
        key: &str,
    ) -> Result<()>;
}
