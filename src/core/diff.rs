//! Snapshot reconciliation.
//!
//! Pure four-way classification of two snapshots. Push, pull-compare, and
//! provider sync all consume the same classification with different
//! interpretations of "old" and "new".

use serde::Serialize;

use crate::core::snapshot::Snapshot;

/// How a single key relates across the old and new snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Present only in the new snapshot.
    Added,
    /// Present only in the old snapshot.
    Removed,
    /// Present in both with differing values.
    Changed,
    /// Present in both with identical values.
    Kept,
}

/// A single classified key.
#[derive(Debug, Clone, Serialize)]
pub struct DiffEntry {
    key: String,
    status: EntryStatus,
}

impl DiffEntry {
    /// The secret key name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The classification.
    pub fn status(&self) -> EntryStatus {
        self.status
    }
}

/// The full reconciliation between two snapshots.
///
/// Entries are sorted by key, so rendering and reports are deterministic.
#[derive(Debug, Serialize)]
pub struct SnapshotDiff {
    entries: Vec<DiffEntry>,
}

impl SnapshotDiff {
    /// Classify every key across `old` and `new`.
    ///
    /// Comparison is exact string equality on names and values. The four
    /// status sets are disjoint and together cover the union of both key
    /// sets.
    pub fn compute(old: &Snapshot, new: &Snapshot) -> Self {
        let mut entries = Vec::new();

        for (key, old_value) in old.iter() {
            let status = match new.get(key) {
                Some(new_value) if new_value == old_value => EntryStatus::Kept,
                Some(_) => EntryStatus::Changed,
                None => EntryStatus::Removed,
            };
            entries.push(DiffEntry {
                key: key.to_string(),
                status,
            });
        }

        for (key, _) in new.iter() {
            if !old.contains(key) {
                entries.push(DiffEntry {
                    key: key.to_string(),
                    status: EntryStatus::Added,
                });
            }
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));

        Self { entries }
    }

    /// All entries, sorted by key.
    pub fn entries(&self) -> &[DiffEntry] {
        &self.entries
    }

    fn keys_with(&self, status: EntryStatus) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.status == status)
            .map(|e| e.key.as_str())
            .collect()
    }

    /// Keys present only in the new snapshot.
    pub fn added(&self) -> Vec<&str> {
        self.keys_with(EntryStatus::Added)
    }

    /// Keys present only in the old snapshot.
    pub fn removed(&self) -> Vec<&str> {
        self.keys_with(EntryStatus::Removed)
    }

    /// Keys present in both with differing values.
    pub fn changed(&self) -> Vec<&str> {
        self.keys_with(EntryStatus::Changed)
    }

    /// Keys present in both with identical values.
    pub fn kept(&self) -> Vec<&str> {
        self.keys_with(EntryStatus::Kept)
    }

    /// Whether the two snapshots are identical.
    pub fn is_clean(&self) -> bool {
        self.entries.iter().all(|e| e.status == EntryStatus::Kept)
    }

    /// Total number of classified keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether both snapshots were empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
