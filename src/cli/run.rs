//! Run command - execute a subprocess with secrets injected into its
//! environment. Secrets never touch disk or the command line.

use crate::api::VaultApi;
use crate::auth::{CredentialStore, Session};
use crate::core::config::Config;
use crate::core::runner;
use crate::error::{Result, ValidationError};

pub fn execute(
    api: &dyn VaultApi,
    store: &dyn CredentialStore,
    env: Option<&str>,
    command: &[String],
) -> Result<()> {
    if command.is_empty() {
        return Err(ValidationError::NoCommand.into());
    }

    let config = Config::load()?;
    let vault = config.vault_ref(env)?;

    let session = Session::new(api, store);
    let snapshot = session.run(|token| session.api().fetch_snapshot(token, &vault))?;

    let code = runner::run(command, &snapshot)?;
    // The child's exit status is the command's exit status.
    std::process::exit(code);
}
