//! Push command - write local secrets to the vault.
//!
//! Additive by default: remote keys missing locally are left alone unless
//! `--prune` is given.

use dialoguer::Confirm;
use std::io::IsTerminal;

use crate::api::VaultApi;
use crate::auth::{CredentialStore, Session};
use crate::cli::{output, require_confirmation};
use crate::core::config::Config;
use crate::core::snapshot::{ParseMode, Snapshot};
use crate::core::sync::{self, PushPlan};
use crate::error::Result;

/// How an invocation ended. A declined confirmation is not "up to date".
enum Outcome {
    Applied(Vec<String>),
    UpToDate,
    Declined,
}

pub fn execute(
    api: &dyn VaultApi,
    store: &dyn CredentialStore,
    env: Option<&str>,
    file: Option<&str>,
    prune: bool,
    yes: bool,
) -> Result<()> {
    let config = Config::load()?;
    let vault = config.vault_ref(env)?;
    let path = config.env_file(file);

    // Strict: a malformed local file must fail before any network call.
    let local = Snapshot::load(&path, ParseMode::Strict)?;

    let interactive = std::io::stdin().is_terminal();
    let session = Session::new(api, store);
    let outcome = session.run(|token| {
        let remote = session.api().fetch_snapshot(token, &vault)?;
        let plan = PushPlan::compute(&remote, &local, prune);

        if plan.is_noop() {
            return Ok(Outcome::UpToDate);
        }

        if require_confirmation(yes, interactive)? && !confirm_push(&vault.to_string(), &plan)? {
            return Ok(Outcome::Declined);
        }

        sync::push(session.api(), token, &vault, &plan).map(Outcome::Applied)
    })?;

    match outcome {
        Outcome::UpToDate => output::success(&format!("{} is up to date", vault)),
        Outcome::Declined => output::dimmed("aborted, nothing pushed"),
        Outcome::Applied(applied) => {
            output::success(&format!("pushed {} keys to {}", applied.len(), vault));
            for key in &applied {
                println!("  {}", output::key(key));
            }
        }
    }

    Ok(())
}

/// Preview counts and ask before mutating the vault.
fn confirm_push(target: &str, plan: &PushPlan) -> Result<bool> {
    output::header(&format!("push to {}", target));
    output::kv("add", plan.added.len());
    output::kv("change", plan.changed.len());
    if !plan.pruned.is_empty() {
        output::kv("delete", plan.pruned.len());
    }
    output::kv("unchanged", plan.unchanged);

    Ok(Confirm::new()
        .with_prompt("apply?")
        .default(false)
        .interact()?)
}
