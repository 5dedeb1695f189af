//! Login command - device authorization or explicit token import.

use tracing::info;

use crate::api::VaultApi;
use crate::auth::{device, CredentialStore};
use crate::cli::output;
use crate::error::Result;

/// Authenticate this machine against the vault service.
pub fn execute(
    api: &dyn VaultApi,
    store: &dyn CredentialStore,
    token: Option<String>,
) -> Result<()> {
    let token = match token {
        Some(token) => {
            // Validate the imported token before trusting it.
            let account = api.whoami(&token)?;
            store.store(&token)?;
            info!(login = %account.login, "token imported");
            token
        }
        None => device::login(api, store)?,
    };

    let account = api.whoami(&token)?;
    output::success(&format!("logged in as {}", account.login));

    Ok(())
}
