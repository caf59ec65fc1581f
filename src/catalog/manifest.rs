//! Reading the build tool's `manifest.json`.
//!
//! Only model-like nodes are kept. Columns come back in manifest order, which
//! requires `serde_json`'s `preserve_order` feature.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::types::TableLocation;
use super::CatalogLoadError;
use crate::source::SourceText;

/// Node types that materialize a relation.
const TABLE_RESOURCE_TYPES: &[&str] = &["model", "seed", "snapshot"];

#[derive(Debug, Deserialize)]
struct RawManifest {
    nodes: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(default)]
    resource_type: String,
    name: String,
    #[serde(default)]
    database: Option<String>,
    #[serde(default)]
    schema: Option<String>,
    #[serde(default)]
    alias: Option<String>,
    #[serde(default)]
    checksum: Option<RawChecksum>,
    #[serde(default)]
    columns: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawChecksum {
    #[serde(default)]
    checksum: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawColumn {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    data_type: Option<String>,
}

/// A table as described by the manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestTable {
    pub name: String,
    pub location: Option<TableLocation>,
    pub checksum: Option<String>,
    /// `(column name, declared type)` in manifest order.
    pub columns: Vec<(String, Option<String>)>,
}

/// Parse a manifest into its tables, in node-key order.
pub fn parse_manifest(source: &SourceText) -> Result<Vec<ManifestTable>, CatalogLoadError> {
    let raw: RawManifest =
        serde_json::from_str(&source.contents).map_err(|e| CatalogLoadError::ManifestJson {
            path: source.path.clone(),
            source: e,
        })?;

    let nodes = raw.nodes.ok_or_else(|| CatalogLoadError::ManifestShape {
        path: source.path.clone(),
        message: "missing top-level 'nodes' object".to_string(),
    })?;

    let mut tables = Vec::new();
    for (key, value) in nodes {
        let node: RawNode =
            serde_json::from_value(value).map_err(|e| CatalogLoadError::ManifestShape {
                path: source.path.clone(),
                message: format!("node '{}': {}", key, e),
            })?;

        if !TABLE_RESOURCE_TYPES.contains(&node.resource_type.as_str()) {
            continue;
        }

        let location = match (node.database, node.schema) {
            (Some(database), Some(schema)) if !database.is_empty() && !schema.is_empty() => {
                Some(TableLocation {
                    database,
                    schema,
                    table: node.alias.unwrap_or_else(|| node.name.clone()),
                })
            }
            _ => None,
        };

        let columns = node
            .columns
            .into_iter()
            .map(|(column_key, value)| {
                let column: RawColumn = serde_json::from_value(value).unwrap_or_default();
                let name = column.name.unwrap_or(column_key);
                let data_type = column.data_type.filter(|t| !t.trim().is_empty());
                (name, data_type)
            })
            .collect();

        tables.push(ManifestTable {
            name: node.name,
            location,
            checksum: node
                .checksum
                .map(|c| c.checksum)
                .filter(|c| !c.is_empty()),
            columns,
        });
    }

    Ok(tables)
}
