//! Validation of the definition set against the catalog.
//!
//! Every rule is a pure function from [`ModelContext`] to a list of
//! [`Finding`]s. Rules never see each other's output and never stop early:
//! a run surfaces every problem in every file at once.
//!
//! Severities:
//!
//! - `REQUIRED`: a prerequisite is missing; no rule runs.
//! - `ERROR`: blocks DDL synthesis.
//! - `WARNING`: blocks only in strict mode.
//! - `INFO`: never blocks.

pub mod rules;

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

pub use rules::{Rule, RULES};

use crate::catalog::CatalogIndex;
use crate::definitions::{DefinitionSet, EntityId, EntityKind};
use crate::graph::EntityGraph;
use crate::resolver::Resolver;

// ============================================================================
// Findings
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Required,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Required => write!(f, "REQUIRED"),
        }
    }
}

/// One problem with one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub kind: EntityKind,
    /// Display name of the offending entity (`table.column` for columns).
    pub entity: String,
    pub message: String,
    /// Closest existing names, for unresolved references.
    pub suggestions: Vec<String>,
    /// Rule that produced the finding.
    pub rule: &'static str,
}

impl Finding {
    pub fn new(
        rule: &'static str,
        severity: Severity,
        kind: EntityKind,
        entity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            kind,
            entity: entity.into(),
            message: message.into(),
            suggestions: Vec::new(),
            rule,
        }
    }

    pub fn error(
        rule: &'static str,
        kind: EntityKind,
        entity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(rule, Severity::Error, kind, entity, message)
    }

    pub fn warning(
        rule: &'static str,
        kind: EntityKind,
        entity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(rule, Severity::Warning, kind, entity, message)
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    /// Whether this finding blocks synthesis.
    pub fn blocks(&self, strict: bool) -> bool {
        match self.severity {
            Severity::Required | Severity::Error => true,
            Severity::Warning => strict,
            Severity::Info => false,
        }
    }

    pub fn entity_id(&self) -> EntityId {
        match (self.kind, self.entity.split_once('.')) {
            (EntityKind::Column, Some((table, column))) => EntityId::column(table, column),
            _ => EntityId::new(self.kind, &self.entity),
        }
    }

    fn sort_key(&self) -> (EntityKind, String, &str, Reverse<Severity>, &str, &str) {
        (
            self.kind,
            self.entity.to_lowercase(),
            &self.entity,
            Reverse(self.severity),
            self.rule,
            &self.message,
        )
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} '{}': {}",
            self.severity, self.kind, self.entity, self.message
        )
    }
}

// ============================================================================
// Context, options and report
// ============================================================================

/// Read-only inputs shared by every rule.
#[derive(Debug, Clone, Copy)]
pub struct ModelContext<'a> {
    pub catalog: &'a CatalogIndex,
    pub definitions: &'a DefinitionSet,
    pub resolver: &'a Resolver<'a>,
    pub graph: &'a EntityGraph,
}

impl<'a> ModelContext<'a> {
    pub fn new(resolver: &'a Resolver<'a>, graph: &'a EntityGraph) -> Self {
        Self {
            catalog: resolver.catalog(),
            definitions: resolver.definitions(),
            resolver,
            graph,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Treat warnings as failures.
    pub strict: bool,
}

impl ValidationOptions {
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Every finding of a run, ordered by entity kind then name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    findings: Vec<Finding>,
    strict: bool,
    entity_count: usize,
}

impl ValidationReport {
    pub fn new(mut findings: Vec<Finding>, strict: bool, entity_count: usize) -> Self {
        findings.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        findings.dedup();
        Self {
            findings,
            strict,
            entity_count,
        }
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| matches!(f.severity, Severity::Error | Severity::Required))
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
    }

    /// Findings that block synthesis under this report's strictness.
    pub fn blocking(&self) -> impl Iterator<Item = &Finding> {
        let strict = self.strict;
        self.findings.iter().filter(move |f| f.blocks(strict))
    }

    /// True when nothing blocks synthesis.
    pub fn passed(&self) -> bool {
        self.blocking().next().is_none()
    }

    /// Entities with at least one blocking finding.
    pub fn invalid_entities(&self) -> BTreeSet<EntityId> {
        self.blocking().map(Finding::entity_id).collect()
    }

    pub fn is_blocked(&self, id: &EntityId) -> bool {
        self.blocking().any(|f| &f.entity_id() == id)
    }

    /// "N of M entities have errors".
    pub fn summary(&self) -> String {
        let invalid = self.invalid_entities().len();
        if invalid == 0 {
            return format!(
                "all {} entities passed ({} warnings)",
                self.entity_count,
                self.count(Severity::Warning)
            );
        }
        format!(
            "{} of {} entities have errors",
            invalid,
            self.entity_count.max(invalid)
        )
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// Run every rule and collect the findings.
pub fn validate(ctx: &ModelContext<'_>, options: &ValidationOptions) -> ValidationReport {
    let entity_count = ctx.catalog.len() + ctx.definitions.len();

    if ctx.catalog.is_empty() {
        let finding = Finding::new(
            "prerequisites",
            Severity::Required,
            EntityKind::Catalog,
            "catalog",
            "catalog has no tables; build the project so the manifest lists its models",
        );
        return ValidationReport::new(vec![finding], options.strict, entity_count);
    }

    let mut findings = Vec::new();
    for rule in RULES {
        let produced = (rule.check)(ctx);
        tracing::debug!(rule = rule.name, findings = produced.len(), "rule finished");
        findings.extend(produced);
    }

    let report = ValidationReport::new(findings, options.strict, entity_count);
    tracing::info!(
        errors = report.count(Severity::Error),
        warnings = report.count(Severity::Warning),
        "{}",
        report.summary()
    );
    report
}
