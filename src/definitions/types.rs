//! Definition entities as authored in YAML.
//!
//! Every field is optional at the serde level: a missing `expr` is a
//! validation finding, not a load failure.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::names::{identity_key, normalize};
use crate::yaml::{opt_scalar, string_or_list};

/// Entity kinds, in the order findings are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Catalog,
    Source,
    Table,
    Column,
    Metric,
    Relationship,
    Filter,
    CustomInstruction,
    VerifiedQuery,
    SemanticView,
}

impl EntityKind {
    /// Kinds authored in definition files (as opposed to catalog entries).
    pub fn is_definition(self) -> bool {
        matches!(
            self,
            EntityKind::Metric
                | EntityKind::Relationship
                | EntityKind::Filter
                | EntityKind::CustomInstruction
                | EntityKind::VerifiedQuery
                | EntityKind::SemanticView
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntityKind::Catalog => "catalog",
            EntityKind::Source => "source",
            EntityKind::Table => "table",
            EntityKind::Column => "column",
            EntityKind::Metric => "metric",
            EntityKind::Relationship => "relationship",
            EntityKind::Filter => "filter",
            EntityKind::CustomInstruction => "custom instruction",
            EntityKind::VerifiedQuery => "verified query",
            EntityKind::SemanticView => "semantic view",
        };
        write!(f, "{}", label)
    }
}

/// Kind plus lookup key: how findings, graph nodes and cache entries name an
/// entity.
///
/// Definitions are keyed by [`identity_key`] so that `total_revenue` and
/// `TotalRevenue` are the same entity. Tables use the plain lookup key and
/// columns use `table.column`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EntityId {
    pub kind: EntityKind,
    pub key: String,
}

impl EntityId {
    pub fn new(kind: EntityKind, name: &str) -> Self {
        let key = if kind.is_definition() {
            identity_key(name)
        } else {
            normalize(name)
        };
        Self { kind, key }
    }

    pub fn column(table: &str, column: &str) -> Self {
        Self {
            kind: EntityKind::Column,
            key: format!("{}.{}", normalize(table), normalize(column)),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_list")]
    pub tables: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub expr: String,
    #[serde(default, deserialize_with = "string_or_list")]
    pub synonyms: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub sample_values: Vec<String>,
    #[serde(skip)]
    pub source: String,
}

/// Fields a relationship may carry; anything else lands in `extra`.
pub const RELATIONSHIP_FIELDS: &[&str] = &[
    "name",
    "left_table",
    "right_table",
    "relationship_conditions",
    "description",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub left_table: String,
    #[serde(default)]
    pub right_table: String,
    #[serde(default, rename = "relationship_conditions", deserialize_with = "string_or_list")]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
    #[serde(skip)]
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_list")]
    pub tables: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub expr: String,
    #[serde(default, deserialize_with = "string_or_list")]
    pub synonyms: Vec<String>,
    #[serde(skip)]
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomInstruction {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub question_categorization: Option<String>,
    #[serde(default)]
    pub sql_generation: Option<String>,
    #[serde(skip)]
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerifiedQuery {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub sql: String,
    #[serde(default, deserialize_with = "string_or_list")]
    pub tables: Vec<String>,
    #[serde(default, deserialize_with = "opt_scalar")]
    pub verified_at: Option<String>,
    #[serde(default, deserialize_with = "opt_scalar")]
    pub verified_by: Option<String>,
    #[serde(default)]
    pub use_as_onboarding_question: bool,
    #[serde(skip)]
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SemanticView {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub tables: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub custom_instructions: Vec<String>,
    #[serde(skip)]
    pub source: String,
}

impl CustomInstruction {
    /// Guidance fields that are present and non-blank.
    pub fn guidance(&self) -> impl Iterator<Item = &str> {
        [&self.sql_generation, &self.question_categorization]
            .into_iter()
            .filter_map(|g| g.as_deref())
            .filter(|g| !g.trim().is_empty())
    }
}
