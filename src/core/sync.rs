//! Synchronization engine.
//!
//! Per invocation: FETCH -> DIFF -> CONFIRM -> APPLY -> REPORT, terminal on
//! the first non-retryable error. Push is additive by default; deletions
//! happen only with an explicit prune/allow-delete request. APPLY issues
//! independent per-key writes with bounded fan-out and collects every
//! outcome before reporting, so the report is deterministic regardless of
//! completion order.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, info};

use crate::api::{ProviderApi, VaultApi};
use crate::core::config::ProviderLink;
use crate::core::constants;
use crate::core::diff::SnapshotDiff;
use crate::core::reference::VaultRef;
use crate::core::snapshot::Snapshot;
use crate::error::{Error, Result, SyncError};

/// One planned APPLY action for a single key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    Put { key: String, value: String },
    Delete { key: String },
}

impl KeyAction {
    pub fn key(&self) -> &str {
        match self {
            KeyAction::Put { key, .. } | KeyAction::Delete { key } => key,
        }
    }
}

/// What a push would do, derived from the local-vs-remote diff.
#[derive(Debug)]
pub struct PushPlan {
    pub actions: Vec<KeyAction>,
    pub added: Vec<String>,
    pub changed: Vec<String>,
    /// Remote-only keys: deleted when pruning, otherwise left untouched.
    pub pruned: Vec<String>,
    pub unchanged: usize,
}

impl PushPlan {
    /// Plan a push of `local` onto `remote`.
    ///
    /// Additive by default: remote-only keys survive unless `prune`.
    pub fn compute(remote: &Snapshot, local: &Snapshot, prune: bool) -> Self {
        let diff = SnapshotDiff::compute(remote, local);

        let added: Vec<String> = diff.added().iter().map(|k| k.to_string()).collect();
        let changed: Vec<String> = diff.changed().iter().map(|k| k.to_string()).collect();
        let pruned: Vec<String> = if prune {
            diff.removed().iter().map(|k| k.to_string()).collect()
        } else {
            Vec::new()
        };

        let mut actions: Vec<KeyAction> = added
            .iter()
            .chain(changed.iter())
            .map(|k| KeyAction::Put {
                key: k.clone(),
                value: local.get(k).unwrap_or_default().to_string(),
            })
            .collect();
        actions.extend(pruned.iter().map(|k| KeyAction::Delete { key: k.clone() }));

        Self {
            actions,
            added,
            changed,
            pruned,
            unchanged: diff.kept().len(),
        }
    }

    /// Whether there is nothing to apply.
    pub fn is_noop(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Deterministic outcome of one APPLY phase.
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Keys applied successfully, sorted.
    pub succeeded: Vec<String>,
    /// Keys that failed with their error category text, sorted. Never values.
    pub failed: Vec<(String, String)>,
    /// Keys skipped because an earlier failure aborted the run, sorted.
    pub skipped: Vec<String>,
}

impl ApplyReport {
    /// Collapse into the invocation result: clean success, a partial-sync
    /// failure, or the first real error when nothing at all was applied.
    pub fn into_result(self, mut first_error: Option<Error>) -> Result<Vec<String>> {
        if self.failed.is_empty() {
            return Ok(self.succeeded);
        }
        if self.succeeded.is_empty() {
            if let Some(e) = first_error.take() {
                return Err(e);
            }
        }
        Err(SyncError::Partial {
            succeeded: self.succeeded,
            failed: self.failed,
        }
        .into())
    }
}

/// Apply a plan against the vault with bounded fan-out.
///
/// Every action is attempted; outcomes are joined and sorted before the
/// report is produced. Returns the report plus the first raw error, which
/// `ApplyReport::into_result` uses when no key succeeded at all.
pub fn apply_vault(
    api: &dyn VaultApi,
    token: &str,
    vault: &VaultRef,
    actions: &[KeyAction],
) -> (ApplyReport, Option<Error>) {
    let workers = constants::MAX_IN_FLIGHT_WRITES.min(actions.len().max(1));
    let next = AtomicUsize::new(0);

    let mut outcomes: Vec<(usize, std::result::Result<(), Error>)> = Vec::new();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(|| {
                    let mut local = Vec::new();
                    loop {
                        let i = next.fetch_add(1, Ordering::SeqCst);
                        let Some(action) = actions.get(i) else { break };
                        let result = match action {
                            KeyAction::Put { key, value } => {
                                api.put_key(token, vault, key, value)
                            }
                            KeyAction::Delete { key } => api.delete_key(token, vault, key),
                        };
                        local.push((i, result));
                    }
                    local
                })
            })
            .collect();

        for handle in handles {
            // Worker closures don't panic; a poisoned join is a bug.
            outcomes.extend(handle.join().expect("apply worker panicked"));
        }
    });

    let mut report = ApplyReport::default();
    let mut first_error = None;
    outcomes.sort_by_key(|(i, _)| *i);
    for (i, result) in outcomes {
        let key = actions[i].key().to_string();
        match result {
            Ok(()) => report.succeeded.push(key),
            Err(e) => {
                // An unauthorized result must bubble up so session recovery
                // can re-authenticate and retry the whole operation.
                if matches!(
                    e,
                    Error::Api(crate::error::ApiError::Unauthorized)
                ) {
                    first_error = Some(e);
                    report.failed.clear();
                    report.succeeded.clear();
                    report
                        .failed
                        .push((key, "unauthorized".to_string()));
                    break;
                }
                report.failed.push((key, e.to_string()));
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    report.succeeded.sort();
    report.failed.sort();
    debug!(
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "apply phase complete"
    );
    (report, first_error)
}

/// Push the local snapshot to the vault. Returns the applied key names.
pub fn push(
    api: &dyn VaultApi,
    token: &str,
    vault: &VaultRef,
    plan: &PushPlan,
) -> Result<Vec<String>> {
    if plan.is_noop() {
        return Ok(Vec::new());
    }

    let (report, first_error) = apply_vault(api, token, vault, &plan.actions);
    if matches!(
        &first_error,
        Some(Error::Api(crate::error::ApiError::Unauthorized))
    ) {
        return Err(crate::error::ApiError::Unauthorized.into());
    }
    info!(vault = %vault, "push applied");
    report.into_result(first_error)
}

/// Write a fetched snapshot to the local file, replacing its contents.
///
/// The caller fetches the full snapshot first; nothing is written on a
/// fetch failure, so the file is never truncated by a network error.
pub fn pull_to_file(snapshot: &Snapshot, path: &Path) -> Result<usize> {
    let mut text = snapshot.format();
    if !text.is_empty() {
        text.push('\n');
    }
    std::fs::write(path, text)?;
    info!(path = %path.display(), keys = snapshot.len(), "pull wrote snapshot");
    Ok(snapshot.len())
}

/// Direction of a provider sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    /// Vault is the source of truth; provider is written.
    Push,
    /// Provider is the source of truth; vault is written.
    Pull,
}

/// What a provider sync would do.
#[derive(Debug)]
pub struct SyncPlan {
    pub direction: SyncDirection,
    pub actions: Vec<KeyAction>,
    /// Keys that exist on both sides with different values. The source side
    /// wins; listed so the overwrite is visible in the report.
    pub overwrites: Vec<String>,
    /// Destination-only keys left in place because deletion wasn't allowed.
    pub blocked_deletes: Vec<String>,
    pub unchanged: usize,
}

impl SyncPlan {
    /// Plan a sync between the vault and the linked provider.
    ///
    /// `added`/`changed` flow from the source to the destination; keys only
    /// on the destination are deleted only when `allow_delete`.
    pub fn compute(
        vault_snapshot: &Snapshot,
        provider_snapshot: &Snapshot,
        direction: SyncDirection,
        allow_delete: bool,
    ) -> Self {
        let (source, destination) = match direction {
            SyncDirection::Push => (vault_snapshot, provider_snapshot),
            SyncDirection::Pull => (provider_snapshot, vault_snapshot),
        };

        let diff = SnapshotDiff::compute(destination, source);

        let overwrites: Vec<String> = diff.changed().iter().map(|k| k.to_string()).collect();
        let mut actions: Vec<KeyAction> = diff
            .added()
            .iter()
            .chain(diff.changed().iter())
            .map(|k| KeyAction::Put {
                key: k.to_string(),
                value: source.get(k).unwrap_or_default().to_string(),
            })
            .collect();

        let mut blocked_deletes = Vec::new();
        for key in diff.removed() {
            if allow_delete {
                actions.push(KeyAction::Delete {
                    key: key.to_string(),
                });
            } else {
                blocked_deletes.push(key.to_string());
            }
        }

        Self {
            direction,
            actions,
            overwrites,
            blocked_deletes,
            unchanged: diff.kept().len(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Apply a push-direction sync plan against the provider.
///
/// Provider writes are sequential and abort on the first failure; keys not
/// yet attempted are reported as skipped rather than blindly retried.
pub fn apply_provider(
    api: &dyn ProviderApi,
    token: &str,
    vault: &VaultRef,
    link: &ProviderLink,
    actions: &[KeyAction],
) -> (ApplyReport, Option<Error>) {
    let mut report = ApplyReport::default();
    let mut first_error = None;

    for (idx, action) in actions.iter().enumerate() {
        let result = match action {
            KeyAction::Put { key, value } => api.put_key(token, vault, link, key, value),
            KeyAction::Delete { key } => api.delete_key(token, vault, link, key),
        };

        match result {
            Ok(()) => report.succeeded.push(action.key().to_string()),
            Err(e) => {
                report.failed.push((action.key().to_string(), e.to_string()));
                first_error = Some(e);
                report.skipped = actions[idx + 1..]
                    .iter()
                    .map(|a| a.key().to_string())
                    .collect();
                break;
            }
        }
    }

    report.succeeded.sort();
    report.skipped.sort();
    (report, first_error)
}
