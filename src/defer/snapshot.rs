//! Catalog snapshots and their difference.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::catalog::{parse_manifest, CatalogIndex, CatalogLoadError, ManifestTable};
use crate::names::normalize;
use crate::source::SourceText;

/// Checksum and location of one table at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotEntry {
    pub name: String,
    pub checksum: String,
    pub location: Option<String>,
}

/// Every table of a manifest, keyed by lookup key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogSnapshot {
    tables: BTreeMap<String, SnapshotEntry>,
}

impl CatalogSnapshot {
    pub fn from_manifest(source: &SourceText) -> Result<Self, CatalogLoadError> {
        let mut snapshot = Self::default();
        for table in parse_manifest(source)? {
            let checksum = table
                .checksum
                .clone()
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| column_hash(&table));
            snapshot.insert(SnapshotEntry {
                location: table.location.as_ref().map(|l| l.to_string()),
                name: table.name,
                checksum,
            });
        }
        Ok(snapshot)
    }

    /// Snapshot of a loaded catalog. Tables without a manifest checksum are
    /// hashed over their column names and types.
    pub fn from_catalog(catalog: &CatalogIndex) -> Self {
        let mut snapshot = Self::default();
        for table in catalog.tables() {
            let checksum = table.checksum.clone().unwrap_or_else(|| {
                hash_columns(
                    table
                        .columns()
                        .iter()
                        .map(|c| (c.name.as_str(), c.data_type.as_deref())),
                )
            });
            snapshot.insert(SnapshotEntry {
                name: table.name.clone(),
                checksum,
                location: table.location.as_ref().map(|l| l.to_string()),
            });
        }
        snapshot
    }

    pub fn insert(&mut self, entry: SnapshotEntry) {
        self.tables.insert(normalize(&entry.name), entry);
    }

    pub fn get(&self, name: &str) -> Option<&SnapshotEntry> {
        self.tables.get(&normalize(name))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

fn column_hash(table: &ManifestTable) -> String {
    hash_columns(
        table
            .columns
            .iter()
            .map(|(name, data_type)| (name.as_str(), data_type.as_deref())),
    )
}

fn hash_columns<'c>(columns: impl Iterator<Item = (&'c str, Option<&'c str>)>) -> String {
    let mut hasher = Sha256::new();
    for (name, data_type) in columns {
        hasher.update(name.as_bytes());
        hasher.update(b":");
        hasher.update(data_type.unwrap_or_default().as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// Diff
// ============================================================================

/// Table-level difference between two snapshots. Names are display names,
/// sorted by lookup key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
    pub unchanged: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.total_changes() == 0
    }

    pub fn total_changes(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }

    /// "2 added, 1 modified, 5 unchanged", or "no changes".
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "no changes".to_string();
        }
        let parts: Vec<String> = [
            (self.added.len(), "added"),
            (self.modified.len(), "modified"),
            (self.removed.len(), "removed"),
            (self.unchanged.len(), "unchanged"),
        ]
        .into_iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, label)| format!("{} {}", count, label))
        .collect();
        parts.join(", ")
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

/// Compare `current` against `reference`.
pub fn diff(current: &CatalogSnapshot, reference: &CatalogSnapshot) -> ChangeSet {
    let mut changes = ChangeSet::default();

    for (key, entry) in &current.tables {
        match reference.tables.get(key) {
            None => changes.added.push(entry.name.clone()),
            Some(old) if old.checksum != entry.checksum => {
                changes.modified.push(entry.name.clone())
            }
            Some(_) => changes.unchanged.push(entry.name.clone()),
        }
    }
    for (key, entry) in &reference.tables {
        if !current.tables.contains_key(key) {
            changes.removed.push(entry.name.clone());
        }
    }

    tracing::info!(
        added = changes.added.len(),
        modified = changes.modified.len(),
        removed = changes.removed.len(),
        "catalog diff: {}",
        changes.summary()
    );
    changes
}
