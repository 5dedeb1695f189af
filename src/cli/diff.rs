//! Diff command - compare snapshots without mutating anything.
//!
//! Default form: local file vs the vault. With `--against`, two named
//! environments are compared instead. Values stay hidden unless `--reveal`.

use serde::Serialize;

use crate::api::VaultApi;
use crate::auth::{CredentialStore, Session};
use crate::cli::output;
use crate::core::config::Config;
use crate::core::diff::{EntryStatus, SnapshotDiff};
use crate::core::snapshot::{ParseMode, Snapshot};
use crate::error::Result;

pub struct Options<'a> {
    pub env: Option<&'a str>,
    pub against: Option<&'a str>,
    pub file: Option<&'a str>,
    pub keys_only: bool,
    pub json: bool,
    pub reveal: bool,
}

pub fn execute(api: &dyn VaultApi, store: &dyn CredentialStore, opts: Options<'_>) -> Result<()> {
    let config = Config::load()?;
    let vault = config.vault_ref(opts.env)?;
    let session = Session::new(api, store);

    // old/new follow the push convention: remote is old, local is new.
    let (old, new, old_label, new_label) = match opts.against {
        Some(other) => {
            let second = vault.with_environment(other)?;
            let (a, b) = session.run(|token| {
                let a = session.api().fetch_snapshot(token, &vault)?;
                let b = session.api().fetch_snapshot(token, &second)?;
                Ok((a, b))
            })?;
            (a, b, vault.environment.clone(), other.to_string())
        }
        None => {
            let path = config.env_file(opts.file);
            let local = if path.exists() {
                Snapshot::load(&path, ParseMode::Lenient)?
            } else {
                output::warn(&format!("{} not found, comparing empty file", path.display()));
                Snapshot::default()
            };
            let remote = session.run(|token| session.api().fetch_snapshot(token, &vault))?;
            (
                remote,
                local,
                vault.environment.clone(),
                path.display().to_string(),
            )
        }
    };

    let diff = SnapshotDiff::compute(&old, &new);

    if opts.json {
        render_json(&diff, &old, &new, opts.reveal)?;
    } else if opts.keys_only {
        for key in changed_keys(&diff) {
            println!("{}", key);
        }
    } else {
        render_table(&diff, &old, &new, &old_label, &new_label, opts.reveal);
    }

    Ok(())
}

/// Keys with a difference, in diff order. Unchanged keys stay out of the
/// human-readable forms; the JSON form keeps the full classification.
fn changed_keys(diff: &SnapshotDiff) -> Vec<&str> {
    diff.entries()
        .iter()
        .filter(|e| e.status() != EntryStatus::Kept)
        .map(|e| e.key())
        .collect()
}

#[derive(Serialize)]
struct JsonEntry<'a> {
    key: &'a str,
    status: EntryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    old_value: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_value: Option<&'a str>,
}

fn render_json(diff: &SnapshotDiff, old: &Snapshot, new: &Snapshot, reveal: bool) -> Result<()> {
    let entries: Vec<JsonEntry<'_>> = diff
        .entries()
        .iter()
        .map(|e| JsonEntry {
            key: e.key(),
            status: e.status(),
            old_value: reveal.then(|| old.get(e.key())).flatten(),
            new_value: reveal.then(|| new.get(e.key())).flatten(),
        })
        .collect();

    println!(
        "{}",
        serde_json::to_string_pretty(&entries).map_err(|e| crate::error::Error::Other(
            e.to_string()
        ))?
    );
    Ok(())
}

fn render_table(
    diff: &SnapshotDiff,
    old: &Snapshot,
    new: &Snapshot,
    old_label: &str,
    new_label: &str,
    reveal: bool,
) {
    if diff.is_clean() {
        output::success(&format!(
            "{} and {} are in sync ({} keys)",
            old_label,
            new_label,
            diff.len()
        ));
        return;
    }

    for entry in diff.entries() {
        let key = entry.key();
        match entry.status() {
            EntryStatus::Added => {
                if reveal {
                    println!("+ {}={}", key, new.get(key).unwrap_or_default());
                } else {
                    println!("+ {} (only in {})", key, new_label);
                }
            }
            EntryStatus::Removed => {
                if reveal {
                    println!("- {}={}", key, old.get(key).unwrap_or_default());
                } else {
                    println!("- {} (only in {})", key, old_label);
                }
            }
            EntryStatus::Changed => {
                if reveal {
                    println!(
                        "~ {}: {} -> {}",
                        key,
                        old.get(key).unwrap_or_default(),
                        new.get(key).unwrap_or_default()
                    );
                } else {
                    println!("~ {} (differs)", key);
                }
            }
            EntryStatus::Kept => {}
        }
    }

    let kept = diff.len() - changed_keys(diff).len();
    if kept > 0 {
        output::dimmed(&format!("{} keys unchanged", kept));
    }
}
