//! The `WITH EXTENSION (CA='...')` block: sample values per table and column.

use serde::Serialize;

use crate::catalog::{CatalogTable, ColumnKind};
use crate::names::sql_identifier;

#[derive(Debug, Serialize)]
struct Extension {
    tables: Vec<ExtensionTable>,
}

#[derive(Debug, Serialize)]
struct ExtensionTable {
    name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dimensions: Vec<ExtensionColumn>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    time_dimensions: Vec<ExtensionColumn>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    facts: Vec<ExtensionColumn>,
}

#[derive(Debug, Serialize)]
struct ExtensionColumn {
    name: String,
    sample_values: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    is_enum: bool,
}

/// Build the escaped CA payload, or `None` when no column has sample values.
pub fn ca_extension(tables: &[&CatalogTable]) -> Result<Option<String>, serde_json::Error> {
    let mut extension = Extension { tables: Vec::new() };

    for table in tables {
        let mut entry = ExtensionTable {
            name: sql_identifier(&table.name),
            dimensions: Vec::new(),
            time_dimensions: Vec::new(),
            facts: Vec::new(),
        };
        for column in table.columns() {
            if column.sample_values.is_empty() {
                continue;
            }
            let item = ExtensionColumn {
                name: sql_identifier(&column.name),
                sample_values: column.sample_values.clone(),
                is_enum: column.is_enum,
            };
            match column.kind() {
                Some(ColumnKind::Fact) => entry.facts.push(item),
                Some(ColumnKind::TimeDimension) => entry.time_dimensions.push(item),
                Some(ColumnKind::Dimension) | None => entry.dimensions.push(item),
            }
        }
        let empty = entry.dimensions.is_empty()
            && entry.time_dimensions.is_empty()
            && entry.facts.is_empty();
        if !empty {
            extension.tables.push(entry);
        }
    }

    if extension.tables.is_empty() {
        return Ok(None);
    }
    let json = serde_json::to_string(&extension)?;
    Ok(Some(escape_payload(&json)))
}

/// Escape JSON for a single-quoted SQL literal.
fn escape_payload(json: &str) -> String {
    json.replace('\\', "\\\\").replace('\'', "''")
}
