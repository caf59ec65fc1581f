//! Catalog Index: the read-only view of every known table and column.
//!
//! The index is assembled from two inputs:
//!
//! 1. the build tool's manifest, which supplies physical locations, column
//!    lists with declared types, and content checksums;
//! 2. per-table metadata blocks, which supply keys, classifications, sample
//!    values, synonyms and privacy categories.
//!
//! Lookups are case-insensitive; display names keep the author's casing.

pub mod manifest;
pub mod metadata;
pub mod types;

use std::collections::HashMap;

pub use manifest::{parse_manifest, ManifestTable};
pub use metadata::{parse_metadata, ColumnMetadata, TableMetadata};
pub use types::{
    CatalogColumn, CatalogTable, ColumnKind, PrivacyCategory, TableLocation, TypeFamily,
};

use crate::names::normalize;
use crate::source::SourceText;

/// Fatal problems building the catalog. Any of these aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum CatalogLoadError {
    #[error("manifest not found; run the build tool to produce manifest.json first")]
    MissingManifest,

    #[error("failed to parse manifest {path}: {source}")]
    ManifestJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed manifest {path}: {message}")]
    ManifestShape { path: String, message: String },

    #[error("failed to parse table metadata {path}: {source}")]
    Metadata {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// A table described by more than one metadata block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateMetadata {
    pub table: String,
    /// Every metadata source that described the table, first one wins.
    pub sources: Vec<String>,
}

/// Name → table index over the whole catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    tables: Vec<CatalogTable>,
    by_key: HashMap<String, usize>,
    duplicates: Vec<DuplicateMetadata>,
}

impl CatalogIndex {
    /// Build the catalog from a manifest and any number of metadata sources.
    pub fn load(
        manifest: Option<&SourceText>,
        metadata: &[SourceText],
    ) -> Result<Self, CatalogLoadError> {
        let manifest = manifest.ok_or(CatalogLoadError::MissingManifest)?;
        let manifest_tables = parse_manifest(manifest)?;

        let mut described = Vec::new();
        for source in metadata {
            described.extend(parse_metadata(source)?);
        }

        let index = Self::from_parts(manifest_tables, described);
        tracing::debug!(
            tables = index.len(),
            duplicates = index.duplicates.len(),
            "catalog loaded"
        );
        Ok(index)
    }

    /// Merge already-parsed manifest tables with metadata blocks.
    pub fn from_parts(manifest: Vec<ManifestTable>, metadata: Vec<TableMetadata>) -> Self {
        let mut index = CatalogIndex::default();

        for entry in manifest {
            let mut table = CatalogTable::new(entry.name);
            table.location = entry.location;
            table.checksum = entry.checksum;
            for (name, data_type) in entry.columns {
                let mut column = CatalogColumn::new(name);
                column.data_type = data_type;
                table.push_column(column);
            }
            index.insert(table);
        }

        let mut seen: HashMap<String, usize> = HashMap::new();
        for meta in metadata {
            let key = normalize(&meta.name);
            if let Some(&slot) = seen.get(&key) {
                let duplicate = &mut index.duplicates[slot];
                duplicate.sources.push(meta.source);
                continue;
            }
            seen.insert(key.clone(), index.duplicates.len());
            index.duplicates.push(DuplicateMetadata {
                table: meta.name.clone(),
                sources: vec![meta.source.clone()],
            });

            match index.by_key.get(&key) {
                Some(&i) => apply_metadata(&mut index.tables[i], meta),
                None => {
                    let mut table = CatalogTable::new(meta.name.clone());
                    apply_metadata(&mut table, meta);
                    index.insert(table);
                }
            }
        }
        index.duplicates.retain(|d| d.sources.len() > 1);

        index.tables.sort_by_key(|t| t.key());
        index.by_key = index
            .tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.key(), i))
            .collect();
        index
    }

    fn insert(&mut self, table: CatalogTable) {
        let key = table.key();
        match self.by_key.get(&key) {
            Some(&i) => self.tables[i] = table,
            None => {
                self.by_key.insert(key, self.tables.len());
                self.tables.push(table);
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&CatalogTable> {
        self.by_key.get(&normalize(name)).map(|&i| &self.tables[i])
    }

    pub fn lookup_column(&self, table: &str, column: &str) -> Option<&CatalogColumn> {
        self.lookup(table).and_then(|t| t.column(column))
    }

    /// Tables sorted by lookup key.
    pub fn tables(&self) -> impl Iterator<Item = &CatalogTable> {
        self.tables.iter()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Tables described by more than one metadata block.
    pub fn duplicates(&self) -> &[DuplicateMetadata] {
        &self.duplicates
    }

    /// Copy of this index with `f` applied to every table.
    pub(crate) fn map_tables(&self, f: impl Fn(&CatalogTable) -> CatalogTable) -> Self {
        Self {
            tables: self.tables.iter().map(f).collect(),
            by_key: self.by_key.clone(),
            duplicates: self.duplicates.clone(),
        }
    }
}

fn apply_metadata(table: &mut CatalogTable, meta: TableMetadata) {
    table.description = meta.description;
    table.primary_key = meta.primary_key;
    table.unique_keys = meta.unique_keys;
    table.synonyms = meta.synonyms;
    table.searchable = meta.searchable;
    table.metadata_source = Some(meta.source);

    let mut declared = Vec::with_capacity(meta.columns.len());
    for column_meta in meta.columns {
        declared.push(normalize(&column_meta.name));
        let manifest_type = table
            .column(&column_meta.name)
            .and_then(|c| c.data_type.clone());

        let mut column = CatalogColumn::new(column_meta.name);
        column.description = column_meta.description;
        column.column_type = column_meta.column_type;
        column.data_type = column_meta.data_type.or(manifest_type);
        column.synonyms = column_meta.synonyms;
        column.sample_values = column_meta.sample_values;
        column.is_enum = column_meta.is_enum;
        column.privacy = column_meta
            .privacy_category
            .as_deref()
            .and_then(PrivacyCategory::parse);

        match table.column_mut(&column.name) {
            Some(existing) => *existing = column,
            None => table.push_column(column),
        }
    }
    table.reorder_columns(&declared);
}
