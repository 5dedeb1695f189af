//! Logout command - delete the stored credential.

use crate::auth::CredentialStore;
use crate::cli::output;
use crate::error::Result;

/// Remove the credential from the OS keychain.
pub fn execute(store: &dyn CredentialStore) -> Result<()> {
    store.delete()?;
    output::success("logged out");
    Ok(())
}
