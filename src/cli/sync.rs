//! Sync command - reconcile the vault with the linked provider.
//!
//! The source side wins: push treats the vault as truth, pull treats the
//! provider as truth. Destination-only keys are deleted only with
//! `--allow-delete`; otherwise they are left in place and reported.

use dialoguer::Confirm;
use std::io::IsTerminal;

use crate::api::{ProviderApi, VaultApi};
use crate::auth::{CredentialStore, Session};
use crate::cli::{output, require_confirmation};
use crate::cli::DirectionArg;
use crate::core::config::Config;
use crate::core::sync::{self, SyncDirection, SyncPlan};
use crate::error::{ApiError, Error, Result};

/// How an invocation ended. A declined confirmation is not "in sync".
enum Outcome {
    Applied(Vec<String>),
    InSync,
    Declined,
}

pub fn execute<A: VaultApi + ProviderApi>(
    api: &A,
    store: &dyn CredentialStore,
    direction: DirectionArg,
    env: Option<&str>,
    allow_delete: bool,
    yes: bool,
) -> Result<()> {
    let config = Config::load()?;
    let vault = config.vault_ref(env)?;
    let link = config.provider()?.clone();
    let direction = match direction {
        DirectionArg::Push => SyncDirection::Push,
        DirectionArg::Pull => SyncDirection::Pull,
    };

    let interactive = std::io::stdin().is_terminal();
    let provider: &dyn ProviderApi = api;
    let session = Session::new(api, store);
    let outcome = session.run(|token| {
        let vault_snapshot = session.api().fetch_snapshot(token, &vault)?;
        let provider_snapshot = provider.fetch_snapshot(token, &vault, &link)?;

        let plan = SyncPlan::compute(&vault_snapshot, &provider_snapshot, direction, allow_delete);

        report_blocked(&plan);
        if !plan.overwrites.is_empty() {
            let winner = match direction {
                SyncDirection::Push => "vault",
                SyncDirection::Pull => "provider",
            };
            output::warn(&format!(
                "{} keys differ on both sides; the {} value wins: {}",
                plan.overwrites.len(),
                winner,
                plan.overwrites.join(", ")
            ));
        }
        if plan.is_noop() {
            return Ok(Outcome::InSync);
        }

        if require_confirmation(yes, interactive)? && !confirm_sync(&vault, &link, &plan)? {
            return Ok(Outcome::Declined);
        }

        let (report, first_error) = match direction {
            SyncDirection::Push => {
                sync::apply_provider(provider, token, &vault, &link, &plan.actions)
            }
            SyncDirection::Pull => sync::apply_vault(session.api(), token, &vault, &plan.actions),
        };

        // Let session recovery re-authenticate and retry the whole run.
        if matches!(&first_error, Some(Error::Api(ApiError::Unauthorized))) {
            return Err(ApiError::Unauthorized.into());
        }

        if !report.skipped.is_empty() {
            output::warn(&format!(
                "{} keys not attempted after the first failure: {}",
                report.skipped.len(),
                report.skipped.join(", ")
            ));
        }
        report.into_result(first_error).map(Outcome::Applied)
    })?;

    match outcome {
        Outcome::InSync => {
            output::success(&format!("{} and {} are in sync", vault, link.name));
        }
        Outcome::Declined => output::dimmed("aborted, nothing synced"),
        Outcome::Applied(applied) => {
            let (from, to) = match direction {
                SyncDirection::Push => (vault.to_string(), link.name.clone()),
                SyncDirection::Pull => (link.name.clone(), vault.to_string()),
            };
            output::success(&format!(
                "synced {} keys from {} to {}",
                applied.len(),
                from,
                to
            ));
            for key in &applied {
                println!("  {}", output::key(key));
            }
        }
    }

    Ok(())
}

fn report_blocked(plan: &SyncPlan) {
    if plan.blocked_deletes.is_empty() {
        return;
    }
    output::warn(&format!(
        "{} destination-only keys kept (pass --allow-delete to remove): {}",
        plan.blocked_deletes.len(),
        plan.blocked_deletes.join(", ")
    ));
}

/// Preview the plan and ask before mutating either side.
fn confirm_sync(
    vault: &crate::core::reference::VaultRef,
    link: &crate::core::config::ProviderLink,
    plan: &SyncPlan,
) -> Result<bool> {
    let title = match plan.direction {
        SyncDirection::Push => format!("sync {} -> {}", vault, link.name),
        SyncDirection::Pull => format!("sync {} -> {}", link.name, vault),
    };
    output::header(&title);
    output::kv("write", plan.actions.len());
    if !plan.overwrites.is_empty() {
        output::kv("overwrite", plan.overwrites.join(", "));
    }
    output::kv("unchanged", plan.unchanged);

    Ok(Confirm::new()
        .with_prompt("apply?")
        .default(false)
        .interact()?)
}
