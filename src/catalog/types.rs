//! Catalog entries: tables, columns and their classifications.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::names::normalize;

// ============================================================================
// Column classification
// ============================================================================

/// How a column participates in the semantic view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Dimension,
    TimeDimension,
    Fact,
}

impl ColumnKind {
    /// Parse a `column_type` value. Accepts the aliases authors commonly use.
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize(raw).as_str() {
            "dimension" => Some(Self::Dimension),
            "time_dimension" | "time" | "date" | "timestamp" => Some(Self::TimeDimension),
            "fact" | "measure" | "metric" => Some(Self::Fact),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Dimension => write!(f, "dimension"),
            ColumnKind::TimeDimension => write!(f, "time_dimension"),
            ColumnKind::Fact => write!(f, "fact"),
        }
    }
}

/// Broad family of a declared SQL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    Numeric,
    Temporal,
    Text,
    Boolean,
    SemiStructured,
    /// No type declared, or one we do not recognise.
    Unknown,
}

impl TypeFamily {
    /// Classify a declared type such as `NUMBER(38,2)` or `timestamp_ntz`.
    pub fn of(data_type: &str) -> Self {
        let upper = data_type.trim().to_uppercase();
        let base = upper
            .split('(')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();

        match base.as_str() {
            "NUMBER" | "NUMERIC" | "DECIMAL" | "DEC" | "INT" | "INTEGER" | "BIGINT"
            | "SMALLINT" | "TINYINT" | "BYTEINT" | "FLOAT" | "FLOAT4" | "FLOAT8" | "DOUBLE"
            | "DOUBLE PRECISION" | "REAL" | "FIXED" => TypeFamily::Numeric,
            "DATE" | "DATETIME" | "TIME" | "TIMESTAMP" | "TIMESTAMP_LTZ" | "TIMESTAMP_NTZ"
            | "TIMESTAMP_TZ" => TypeFamily::Temporal,
            "VARCHAR" | "CHAR" | "CHARACTER" | "STRING" | "TEXT" | "NVARCHAR" | "NCHAR" => {
                TypeFamily::Text
            }
            "BOOLEAN" | "BOOL" => TypeFamily::Boolean,
            "VARIANT" | "OBJECT" | "ARRAY" => TypeFamily::SemiStructured,
            _ if base.starts_with("TIMESTAMP") => TypeFamily::Temporal,
            _ => TypeFamily::Unknown,
        }
    }
}

/// Privacy classification of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyCategory {
    Public,
    QuasiIdentifier,
    DirectIdentifier,
    Sensitive,
}

impl PrivacyCategory {
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize(raw).as_str() {
            "public" | "none" => Some(Self::Public),
            "quasi_identifier" => Some(Self::QuasiIdentifier),
            "direct_identifier" => Some(Self::DirectIdentifier),
            "sensitive" => Some(Self::Sensitive),
            _ => None,
        }
    }
}

// ============================================================================
// Tables and columns
// ============================================================================

/// Physical location of a table in the warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableLocation {
    pub database: String,
    pub schema: String,
    /// Physical relation name (the manifest alias when one is set).
    pub table: String,
}

impl TableLocation {
    /// Same location in another database.
    pub fn with_database(&self, database: &str) -> Self {
        Self {
            database: database.to_string(),
            schema: self.schema.clone(),
            table: self.table.clone(),
        }
    }
}

impl fmt::Display for TableLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.database, self.schema, self.table)
    }
}

/// A column of a catalog table.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogColumn {
    /// Display name.
    pub name: String,
    pub description: Option<String>,
    /// `column_type` exactly as declared; see [`CatalogColumn::kind`].
    pub column_type: Option<String>,
    pub data_type: Option<String>,
    pub synonyms: Vec<String>,
    pub sample_values: Vec<String>,
    pub is_enum: bool,
    pub privacy: Option<PrivacyCategory>,
}

impl CatalogColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            column_type: None,
            data_type: None,
            synonyms: Vec::new(),
            sample_values: Vec::new(),
            is_enum: false,
            privacy: None,
        }
    }

    /// Classification, if `column_type` is present and recognised.
    pub fn kind(&self) -> Option<ColumnKind> {
        self.column_type.as_deref().and_then(ColumnKind::parse)
    }

    pub fn type_family(&self) -> TypeFamily {
        self.data_type
            .as_deref()
            .map(TypeFamily::of)
            .unwrap_or(TypeFamily::Unknown)
    }

    pub fn is_direct_identifier(&self) -> bool {
        self.privacy == Some(PrivacyCategory::DirectIdentifier)
    }
}

/// A table known to the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogTable {
    /// Display name.
    pub name: String,
    pub description: Option<String>,
    /// `None` for tables described in metadata but absent from the manifest.
    pub location: Option<TableLocation>,
    pub primary_key: Vec<String>,
    pub unique_keys: Vec<Vec<String>>,
    pub searchable: bool,
    pub synonyms: Vec<String>,
    /// Content checksum from the manifest.
    pub checksum: Option<String>,
    /// Metadata file the table was described in, if any.
    pub metadata_source: Option<String>,
    columns: Vec<CatalogColumn>,
    column_index: HashMap<String, usize>,
}

impl CatalogTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            location: None,
            primary_key: Vec::new(),
            unique_keys: Vec::new(),
            searchable: false,
            synonyms: Vec::new(),
            checksum: None,
            metadata_source: None,
            columns: Vec::new(),
            column_index: HashMap::new(),
        }
    }

    /// Lookup key of this table.
    pub fn key(&self) -> String {
        normalize(&self.name)
    }

    /// Columns in catalog declaration order.
    pub fn columns(&self) -> &[CatalogColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&CatalogColumn> {
        self.column_index
            .get(&normalize(name))
            .map(|&i| &self.columns[i])
    }

    pub(crate) fn column_mut(&mut self, name: &str) -> Option<&mut CatalogColumn> {
        match self.column_index.get(&normalize(name)) {
            Some(&i) => Some(&mut self.columns[i]),
            None => None,
        }
    }

    /// Append a column, replacing any existing column with the same key.
    pub fn push_column(&mut self, column: CatalogColumn) {
        let key = normalize(&column.name);
        match self.column_index.get(&key) {
            Some(&i) => self.columns[i] = column,
            None => {
                self.column_index.insert(key, self.columns.len());
                self.columns.push(column);
            }
        }
    }

    /// Reorder columns so that `leading` (lookup keys) come first, in that
    /// order; the rest keep their relative order.
    pub(crate) fn reorder_columns(&mut self, leading: &[String]) {
        let mut ordered = Vec::with_capacity(self.columns.len());
        let mut taken = vec![false; self.columns.len()];
        for key in leading {
            if let Some(&i) = self.column_index.get(key) {
                if !taken[i] {
                    taken[i] = true;
                    ordered.push(self.columns[i].clone());
                }
            }
        }
        for (i, column) in self.columns.iter().enumerate() {
            if !taken[i] {
                ordered.push(column.clone());
            }
        }
        self.columns = Vec::new();
        self.column_index.clear();
        for column in ordered {
            self.push_column(column);
        }
    }

    /// Every declared uniqueness witness: the primary key followed by each
    /// unique key, as lookup keys.
    pub fn key_sets(&self) -> Vec<Vec<String>> {
        let mut sets = Vec::new();
        if !self.primary_key.is_empty() {
            sets.push(self.primary_key.iter().map(|c| normalize(c)).collect());
        }
        for unique in &self.unique_keys {
            if !unique.is_empty() {
                sets.push(unique.iter().map(|c| normalize(c)).collect());
            }
        }
        sets
    }
}
