//! Definition sources: metrics, relationships, filters, custom instructions,
//! verified queries and semantic views.
//!
//! Loading is fail-soft. A file that does not parse, or an entry that does
//! not fit its shape, becomes a [`LoadIssue`] and every other entry still
//! loads, so one run reports every broken file at once.

pub mod types;

use serde::Serialize;
use serde_yaml::{Mapping, Value};
use sha2::{Digest, Sha256};

pub use types::{
    CustomInstruction, EntityId, EntityKind, Filter, Metric, Relationship, SemanticView,
    VerifiedQuery, RELATIONSHIP_FIELDS,
};

use crate::names::identity_key;
use crate::source::SourceText;

/// Top-level keys of a definition file.
pub const METRICS_KEY: &str = "snowflake_metrics";
pub const RELATIONSHIPS_KEY: &str = "snowflake_relationships";
pub const FILTERS_KEY: &str = "snowflake_filters";
pub const CUSTOM_INSTRUCTIONS_KEY: &str = "snowflake_custom_instructions";
pub const VERIFIED_QUERIES_KEY: &str = "snowflake_verified_queries";
pub const SEMANTIC_VIEWS_KEY: &str = "semantic_views";

/// A definition source that could not be (fully) read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadIssue {
    pub path: String,
    pub message: String,
}

/// Every definition of one compilation run, in source order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DefinitionSet {
    pub metrics: Vec<Metric>,
    pub relationships: Vec<Relationship>,
    pub filters: Vec<Filter>,
    pub custom_instructions: Vec<CustomInstruction>,
    pub verified_queries: Vec<VerifiedQuery>,
    pub views: Vec<SemanticView>,
    #[serde(skip)]
    pub issues: Vec<LoadIssue>,
}

impl DefinitionSet {
    /// Load definitions from every source, accumulating issues.
    pub fn load(sources: &[SourceText]) -> Self {
        let mut set = DefinitionSet::default();
        for source in sources {
            set.load_source(source);
        }
        tracing::debug!(
            metrics = set.metrics.len(),
            relationships = set.relationships.len(),
            filters = set.filters.len(),
            custom_instructions = set.custom_instructions.len(),
            verified_queries = set.verified_queries.len(),
            views = set.views.len(),
            issues = set.issues.len(),
            "definitions loaded"
        );
        set
    }

    fn load_source(&mut self, source: &SourceText) {
        if source.contents.trim().is_empty() {
            return;
        }

        let document: Value = match serde_yaml::from_str(&source.contents) {
            Ok(value) => value,
            Err(e) => {
                self.issue(source, format!("invalid YAML: {}", e));
                return;
            }
        };

        let mapping = match document {
            Value::Mapping(mapping) => mapping,
            Value::Null => return,
            _ => {
                self.issue(source, "expected a mapping at the top level".to_string());
                return;
            }
        };

        let mut metrics = self.entries::<Metric>(source, &mapping, METRICS_KEY);
        metrics.iter_mut().for_each(|e| e.source = source.path.clone());
        self.metrics.extend(metrics);

        let mut relationships = self.entries::<Relationship>(source, &mapping, RELATIONSHIPS_KEY);
        relationships.iter_mut().for_each(|e| e.source = source.path.clone());
        self.relationships.extend(relationships);

        let mut filters = self.entries::<Filter>(source, &mapping, FILTERS_KEY);
        filters.iter_mut().for_each(|e| e.source = source.path.clone());
        self.filters.extend(filters);

        let mut instructions =
            self.entries::<CustomInstruction>(source, &mapping, CUSTOM_INSTRUCTIONS_KEY);
        instructions.iter_mut().for_each(|e| e.source = source.path.clone());
        self.custom_instructions.extend(instructions);

        let mut queries = self.entries::<VerifiedQuery>(source, &mapping, VERIFIED_QUERIES_KEY);
        queries.iter_mut().for_each(|e| e.source = source.path.clone());
        self.verified_queries.extend(queries);

        let mut views = self.entries::<SemanticView>(source, &mapping, SEMANTIC_VIEWS_KEY);
        views.iter_mut().for_each(|e| e.source = source.path.clone());
        self.views.extend(views);
    }

    fn entries<T>(&mut self, source: &SourceText, mapping: &Mapping, key: &str) -> Vec<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let items = match mapping.get(key) {
            None | Some(Value::Null) => return Vec::new(),
            Some(Value::Sequence(items)) => items,
            Some(_) => {
                self.issue(source, format!("'{}' must be a list", key));
                return Vec::new();
            }
        };

        let mut parsed = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            match serde_yaml::from_value::<T>(item.clone()) {
                Ok(entry) => parsed.push(entry),
                Err(e) => self.issue(source, format!("{}[{}]: {}", key, i, e)),
            }
        }
        parsed
    }

    fn issue(&mut self, source: &SourceText, message: String) {
        tracing::warn!(path = %source.path, %message, "definition source skipped");
        self.issues.push(LoadIssue {
            path: source.path.clone(),
            message,
        });
    }

    /// Total number of named definitions.
    pub fn len(&self) -> usize {
        self.metrics.len()
            + self.relationships.len()
            + self.filters.len()
            + self.custom_instructions.len()
            + self.verified_queries.len()
            + self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn view(&self, name: &str) -> Option<&SemanticView> {
        let key = identity_key(name);
        self.views.iter().find(|v| identity_key(&v.name) == key)
    }

    /// SHA256 over the serialized definitions.
    ///
    /// Two runs over the same sources produce the same fingerprint, so callers
    /// can skip regeneration when nothing changed.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        compute_hash(self)
    }
}

fn compute_hash<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
