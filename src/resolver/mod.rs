//! Reference Resolver: binds markers to catalog entries and definitions.
//!
//! Resolution is lazy. Each expression is resolved the first time someone
//! asks for it and the result is cached per `(owning entity, raw text)`, so
//! validation and synthesis share the work. The resolver itself is read-only
//! apart from that cache and can be shared across threads.

pub mod suggest;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

pub use suggest::{levenshtein, similarity, suggest, SuggestionConfig};

use crate::catalog::{CatalogIndex, CatalogTable};
use crate::definitions::{CustomInstruction, DefinitionSet, EntityId, EntityKind, Metric};
use crate::names::identity_key;
use crate::template::{
    parse_table_entry, parse_template, Marker, Reference, ReferenceSyntaxError, Span, Template,
};

// ============================================================================
// Resolution results
// ============================================================================

/// What a resolved marker points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Table { table: String },
    Column { table: String, column: String },
    Metric { name: String, index: usize },
    Instruction { name: String, index: usize },
}

impl Target {
    /// Graph identity of the target.
    pub fn entity_id(&self) -> EntityId {
        match self {
            Target::Table { table } => EntityId::new(EntityKind::Table, table),
            Target::Column { table, column } => EntityId::column(table, column),
            Target::Metric { name, .. } => EntityId::new(EntityKind::Metric, name),
            Target::Instruction { name, .. } => EntityId::new(EntityKind::CustomInstruction, name),
        }
    }
}

/// Why a reference did not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
    UnknownTable,
    UnknownColumn { table: String },
    UnknownMetric,
    UnknownInstruction,
}

/// A reference naming something that does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    pub reference: Reference,
    pub span: Option<Span>,
    /// The name that was looked up.
    pub attempted: String,
    pub reason: UnresolvedReason,
    /// Closest existing names, best first.
    pub suggestions: Vec<String>,
}

impl fmt::Display for UnresolvedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            UnresolvedReason::UnknownTable => write!(f, "table '{}' not found", self.attempted)?,
            UnresolvedReason::UnknownColumn { table } => write!(
                f,
                "column '{}' not found on table '{}'",
                self.attempted, table
            )?,
            UnresolvedReason::UnknownMetric => {
                write!(f, "metric '{}' not found", self.attempted)?
            }
            UnresolvedReason::UnknownInstruction => {
                write!(f, "custom instruction '{}' not found", self.attempted)?
            }
        }
        if !self.suggestions.is_empty() {
            let quoted: Vec<String> = self.suggestions.iter().map(|s| format!("'{}'", s)).collect();
            write!(f, "; did you mean {}?", quoted.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for UnresolvedReference {}

/// Everything known about one piece of definition text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// `None` when the text has marker syntax errors.
    pub template: Option<Template>,
    pub resolved: Vec<(Marker, Target)>,
    pub unresolved: Vec<UnresolvedReference>,
    pub syntax_errors: Vec<ReferenceSyntaxError>,
}

impl Resolution {
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty() && self.syntax_errors.is_empty()
    }

    /// Target of the marker at `span`.
    pub fn target_at(&self, span: Span) -> Option<&Target> {
        self.resolved
            .iter()
            .find(|(marker, _)| marker.span == span)
            .map(|(_, target)| target)
    }

    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.resolved.iter().map(|(_, target)| target)
    }
}

/// A `tables:` or `custom_instructions:` entry that did not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    Syntax(Vec<ReferenceSyntaxError>),
    Unresolved(UnresolvedReference),
}

impl fmt::Display for EntryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryError::Syntax(errors) => {
                let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                write!(f, "{}", messages.join("; "))
            }
            EntryError::Unresolved(unresolved) => write!(f, "{}", unresolved),
        }
    }
}

// ============================================================================
// Resolver
// ============================================================================

type CacheKey = (EntityId, String);

pub struct Resolver<'a> {
    catalog: &'a CatalogIndex,
    definitions: &'a DefinitionSet,
    config: SuggestionConfig,
    metrics: HashMap<String, usize>,
    instructions: HashMap<String, usize>,
    cache: DashMap<CacheKey, Arc<Resolution>>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        catalog: &'a CatalogIndex,
        definitions: &'a DefinitionSet,
        config: SuggestionConfig,
    ) -> Self {
        // First definition wins; duplicates are reported by validation.
        let mut metrics = HashMap::new();
        for (i, metric) in definitions.metrics.iter().enumerate() {
            if !metric.name.trim().is_empty() {
                metrics.entry(identity_key(&metric.name)).or_insert(i);
            }
        }
        let mut instructions = HashMap::new();
        for (i, instruction) in definitions.custom_instructions.iter().enumerate() {
            if !instruction.name.trim().is_empty() {
                instructions.entry(identity_key(&instruction.name)).or_insert(i);
            }
        }

        Self {
            catalog,
            definitions,
            config,
            metrics,
            instructions,
            cache: DashMap::new(),
        }
    }

    pub fn catalog(&self) -> &'a CatalogIndex {
        self.catalog
    }

    pub fn definitions(&self) -> &'a DefinitionSet {
        self.definitions
    }

    pub fn config(&self) -> &SuggestionConfig {
        &self.config
    }

    pub fn metric(&self, name: &str) -> Option<&'a Metric> {
        self.metric_index(name).map(|i| &self.definitions.metrics[i])
    }

    pub fn metric_index(&self, name: &str) -> Option<usize> {
        self.metrics.get(&identity_key(name)).copied()
    }

    pub fn instruction(&self, name: &str) -> Option<&'a CustomInstruction> {
        self.instructions
            .get(&identity_key(name))
            .map(|&i| &self.definitions.custom_instructions[i])
    }

    /// Number of cached resolutions.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Resolve every marker in `raw`, owned by `owner`. Cached.
    pub fn resolve(&self, owner: &EntityId, raw: &str) -> Arc<Resolution> {
        let key = (owner.clone(), raw.to_string());
        if let Some(hit) = self.cache.get(&key) {
            return Arc::clone(hit.value());
        }
        let resolution = Arc::new(self.resolve_text(raw));
        self.cache.insert(key, Arc::clone(&resolution));
        resolution
    }

    fn resolve_text(&self, raw: &str) -> Resolution {
        let template = match parse_template(raw) {
            Ok(template) => template,
            Err(errors) => {
                return Resolution {
                    syntax_errors: errors,
                    ..Resolution::default()
                }
            }
        };

        let mut resolution = Resolution::default();
        for marker in template.markers() {
            match self.resolve_reference(&marker.reference, Some(marker.span)) {
                Ok(target) => resolution.resolved.push((marker.clone(), target)),
                Err(unresolved) => resolution.unresolved.push(unresolved),
            }
        }
        resolution.template = Some(template);
        resolution
    }

    /// Resolve a single reference.
    pub fn resolve_reference(
        &self,
        reference: &Reference,
        span: Option<Span>,
    ) -> Result<Target, UnresolvedReference> {
        let unresolved = |attempted: &str, reason, suggestions| UnresolvedReference {
            reference: reference.clone(),
            span,
            attempted: attempted.to_string(),
            reason,
            suggestions,
        };

        match reference {
            Reference::Table { table } => match self.catalog.lookup(table) {
                Some(found) => Ok(Target::Table {
                    table: found.name.clone(),
                }),
                None => Err(unresolved(
                    table,
                    UnresolvedReason::UnknownTable,
                    self.suggest_tables(table),
                )),
            },
            Reference::Column { table, column } => {
                let Some(found) = self.catalog.lookup(table) else {
                    return Err(unresolved(
                        table,
                        UnresolvedReason::UnknownTable,
                        self.suggest_tables(table),
                    ));
                };
                match found.column(column) {
                    Some(col) => Ok(Target::Column {
                        table: found.name.clone(),
                        column: col.name.clone(),
                    }),
                    None => Err(unresolved(
                        column,
                        UnresolvedReason::UnknownColumn {
                            table: found.name.clone(),
                        },
                        suggest(
                            column,
                            found.columns().iter().map(|c| c.name.as_str()),
                            &self.config,
                        ),
                    )),
                }
            }
            Reference::Metric { name } => match self.metric_index(name) {
                Some(index) => Ok(Target::Metric {
                    name: self.definitions.metrics[index].name.clone(),
                    index,
                }),
                None => Err(unresolved(
                    name,
                    UnresolvedReason::UnknownMetric,
                    suggest(
                        name,
                        self.definitions.metrics.iter().map(|m| m.name.as_str()),
                        &self.config,
                    ),
                )),
            },
            Reference::Instruction { name } => match self.instructions.get(&identity_key(name)) {
                Some(&index) => Ok(Target::Instruction {
                    name: self.definitions.custom_instructions[index].name.clone(),
                    index,
                }),
                None => Err(self.unknown_instruction(name, span)),
            },
        }
    }

    fn unknown_instruction(&self, name: &str, span: Option<Span>) -> UnresolvedReference {
        UnresolvedReference {
            reference: Reference::Instruction {
                name: name.to_string(),
            },
            span,
            attempted: name.to_string(),
            reason: UnresolvedReason::UnknownInstruction,
            suggestions: suggest(
                name,
                self.definitions
                    .custom_instructions
                    .iter()
                    .map(|c| c.name.as_str()),
                &self.config,
            ),
        }
    }

    fn suggest_tables(&self, name: &str) -> Vec<String> {
        suggest(name, self.catalog.table_names(), &self.config)
    }

    /// Resolve one `tables:` entry (a table marker or a bare name).
    pub fn resolve_table_entry(&self, raw: &str) -> Result<&'a CatalogTable, EntryError> {
        let name = parse_table_entry(raw).map_err(EntryError::Syntax)?;
        match self.catalog.lookup(&name) {
            Some(table) => Ok(table),
            None => Err(EntryError::Unresolved(UnresolvedReference {
                reference: Reference::Table {
                    table: name.clone(),
                },
                span: None,
                suggestions: self.suggest_tables(&name),
                attempted: name,
                reason: UnresolvedReason::UnknownTable,
            })),
        }
    }

    /// Resolve one `custom_instructions:` entry (a marker or a bare name).
    pub fn resolve_instruction_entry(
        &self,
        raw: &str,
    ) -> Result<&'a CustomInstruction, EntryError> {
        let name = if raw.contains("{{") {
            let template = parse_template(raw).map_err(EntryError::Syntax)?;
            match template.references().collect::<Vec<_>>().as_slice() {
                [Reference::Instruction { name }] if template.is_markers_only() => name.clone(),
                _ => {
                    return Err(EntryError::Syntax(vec![ReferenceSyntaxError::Malformed {
                        span: Span::new(0, raw.len()),
                        message: "expected a single custom_instructions marker".to_string(),
                    }]))
                }
            }
        } else {
            raw.trim().to_string()
        };

        self.instruction(&name)
            .ok_or_else(|| EntryError::Unresolved(self.unknown_instruction(&name, None)))
    }

    /// Resolve a list of table entries, keeping the successful ones in order.
    pub fn resolve_tables(&self, raws: &[String]) -> Vec<&'a CatalogTable> {
        raws.iter()
            .filter_map(|raw| self.resolve_table_entry(raw).ok())
            .collect()
    }
}

impl fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("tables", &self.catalog.len())
            .field("definitions", &self.definitions.len())
            .field("cached", &self.cache.len())
            .finish()
    }
}
