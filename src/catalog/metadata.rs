//! Per-table metadata blocks written alongside each model's YAML.
//!
//! ```yaml
//! models:
//!   - name: orders
//!     description: One row per order
//!     meta:
//!       sst:
//!         primary_key: [order_id]
//!         unique_keys: [customer_id, ordered_at]
//!         synonyms: [purchases]
//!     columns:
//!       - name: amount
//!         meta:
//!           sst:
//!             column_type: fact
//!             data_type: number
//! ```
//!
//! The `sst` block may also sit under `config.meta`.

use serde::Deserialize;
use serde_yaml::Value;

use super::CatalogLoadError;
use crate::source::SourceText;
use crate::yaml::{key_list, key_lists, opt_scalar, scalar_to_string, string_or_list};

#[derive(Debug, Default, Deserialize)]
struct MetadataFile {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    meta: Option<MetaBlock<TableSst>>,
    #[serde(default)]
    config: Option<ConfigBlock<TableSst>>,
    #[serde(default)]
    columns: Vec<ColumnEntry>,
}

#[derive(Debug, Deserialize)]
struct ColumnEntry {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    data_type: Option<String>,
    #[serde(default)]
    meta: Option<MetaBlock<ColumnSst>>,
    #[serde(default)]
    config: Option<ConfigBlock<ColumnSst>>,
}

#[derive(Debug, Deserialize)]
struct MetaBlock<T> {
    #[serde(default)]
    sst: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ConfigBlock<T> {
    #[serde(default)]
    meta: Option<MetaBlock<T>>,
}

fn sst_of<T>(meta: Option<MetaBlock<T>>, config: Option<ConfigBlock<T>>) -> Option<T> {
    meta.and_then(|m| m.sst)
        .or_else(|| config.and_then(|c| c.meta).and_then(|m| m.sst))
}

#[derive(Debug, Default, Deserialize)]
struct TableSst {
    #[serde(default, deserialize_with = "key_list")]
    primary_key: Vec<String>,
    #[serde(default, deserialize_with = "key_lists")]
    unique_keys: Vec<Vec<String>>,
    #[serde(default, deserialize_with = "string_or_list")]
    synonyms: Vec<String>,
    #[serde(default)]
    cortex_searchable: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ColumnSst {
    #[serde(default, deserialize_with = "opt_scalar")]
    column_type: Option<String>,
    #[serde(default, deserialize_with = "opt_scalar")]
    data_type: Option<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    synonyms: Vec<String>,
    #[serde(default)]
    sample_values: Vec<Value>,
    #[serde(default)]
    is_enum: bool,
    #[serde(default, deserialize_with = "opt_scalar")]
    privacy_category: Option<String>,
}

/// Table metadata as authored.
#[derive(Debug, Clone, PartialEq)]
pub struct TableMetadata {
    pub name: String,
    pub description: Option<String>,
    pub primary_key: Vec<String>,
    pub unique_keys: Vec<Vec<String>>,
    pub synonyms: Vec<String>,
    pub searchable: bool,
    pub columns: Vec<ColumnMetadata>,
    pub source: String,
}

/// Column metadata as authored.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    pub name: String,
    pub description: Option<String>,
    pub column_type: Option<String>,
    pub data_type: Option<String>,
    pub synonyms: Vec<String>,
    pub sample_values: Vec<String>,
    pub is_enum: bool,
    pub privacy_category: Option<String>,
}

/// Parse one metadata file. Files without a `models` key yield nothing.
pub fn parse_metadata(source: &SourceText) -> Result<Vec<TableMetadata>, CatalogLoadError> {
    if source.contents.trim().is_empty() {
        return Ok(Vec::new());
    }

    let file: Option<MetadataFile> =
        serde_yaml::from_str(&source.contents).map_err(|e| CatalogLoadError::Metadata {
            path: source.path.clone(),
            source: e,
        })?;

    let tables = file
        .unwrap_or_default()
        .models
        .into_iter()
        .map(|model| {
            let sst = sst_of(model.meta, model.config).unwrap_or_default();
            let columns = model
                .columns
                .into_iter()
                .map(|column| {
                    let sst = sst_of(column.meta, column.config).unwrap_or_default();
                    ColumnMetadata {
                        name: column.name,
                        description: column.description.filter(|d| !d.trim().is_empty()),
                        column_type: sst.column_type,
                        data_type: sst.data_type.or(column.data_type),
                        synonyms: sst.synonyms,
                        sample_values: sst
                            .sample_values
                            .iter()
                            .filter_map(scalar_to_string)
                            .collect(),
                        is_enum: sst.is_enum,
                        privacy_category: sst.privacy_category,
                    }
                })
                .collect();

            TableMetadata {
                name: model.name,
                description: model.description.filter(|d| !d.trim().is_empty()),
                primary_key: sst.primary_key,
                unique_keys: sst.unique_keys,
                synonyms: sst.synonyms,
                searchable: sst.cortex_searchable,
                columns,
                source: source.path.clone(),
            }
        })
        .collect();

    Ok(tables)
}
