//! Whoami command - show the authenticated account.

use crate::api::VaultApi;
use crate::auth::{CredentialStore, Session};
use crate::error::Result;

/// Print the account behind the stored credential.
pub fn execute(api: &dyn VaultApi, store: &dyn CredentialStore) -> Result<()> {
    let session = Session::new(api, store);
    let account = session.run(|token| session.api().whoami(token))?;

    match account.name {
        Some(name) => println!("{} ({})", account.login, name),
        None => println!("{}", account.login),
    }
    Ok(())
}
