//! Pull command - replace the local secret file with the vault snapshot.
//!
//! All-or-nothing: the file is only written after the full snapshot has been
//! fetched and decoded, so a network failure never truncates it.

use dialoguer::Confirm;
use std::io::IsTerminal;

use crate::api::VaultApi;
use crate::auth::{CredentialStore, Session};
use crate::cli::{output, require_confirmation};
use crate::core::config::Config;
use crate::core::sync;
use crate::error::Result;

pub fn execute(
    api: &dyn VaultApi,
    store: &dyn CredentialStore,
    env: Option<&str>,
    file: Option<&str>,
    yes: bool,
) -> Result<()> {
    let config = Config::load()?;
    let vault = config.vault_ref(env)?;
    let path = config.env_file(file);

    let interactive = std::io::stdin().is_terminal();
    if path.exists()
        && require_confirmation(yes, interactive)?
        && !confirm_overwrite(&path.display().to_string())?
    {
        output::dimmed("aborted, nothing pulled");
        return Ok(());
    }

    let session = Session::new(api, store);
    let snapshot = session.run(|token| session.api().fetch_snapshot(token, &vault))?;

    // Keep the previous contents around; `.env.*` is gitignored anyway.
    if path.exists() {
        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let backup = path.with_file_name(format!(
            "{}.{}.bak",
            path.file_name().unwrap_or_default().to_string_lossy(),
            timestamp
        ));
        std::fs::copy(&path, &backup)?;
        output::dimmed(&format!("previous file saved as {}", backup.display()));
    }

    let written = sync::pull_to_file(&snapshot, &path)?;
    output::success(&format!(
        "pulled {} secrets from {} into {}",
        written,
        vault,
        path.display()
    ));

    Ok(())
}

fn confirm_overwrite(path: &str) -> Result<bool> {
    Ok(Confirm::new()
        .with_prompt(format!("overwrite {}?", path))
        .default(false)
        .interact()?)
}
