//! Every marker and every table or instruction entry must resolve.

use std::collections::HashMap;

use super::display_name;
use crate::definitions::{EntityId, EntityKind};
use crate::names::identity_key;
use crate::resolver::{EntryError, Target};
use crate::validation::{Finding, ModelContext, Severity};

pub(super) const RULE: &str = "references";

struct Checker<'c, 'a> {
    ctx: &'c ModelContext<'a>,
    metric_counts: HashMap<String, usize>,
    findings: Vec<Finding>,
}

pub(super) fn check(ctx: &ModelContext<'_>) -> Vec<Finding> {
    let defs = ctx.definitions;
    let mut metric_counts = HashMap::new();
    for metric in &defs.metrics {
        if !metric.name.trim().is_empty() {
            *metric_counts.entry(identity_key(&metric.name)).or_insert(0) += 1;
        }
    }

    let mut checker = Checker {
        ctx,
        metric_counts,
        findings: Vec::new(),
    };

    for (i, metric) in defs.metrics.iter().enumerate() {
        let name = display_name(&metric.name, EntityKind::Metric, i);
        checker.entries(EntityKind::Metric, &name, "tables", &metric.tables, Severity::Error);
        checker.text(EntityKind::Metric, &name, "expr", &metric.expr);
    }

    for (i, relationship) in defs.relationships.iter().enumerate() {
        let name = display_name(&relationship.name, EntityKind::Relationship, i);
        for (field, entry) in [
            ("left_table", &relationship.left_table),
            ("right_table", &relationship.right_table),
        ] {
            if !entry.trim().is_empty() {
                checker.entries(
                    EntityKind::Relationship,
                    &name,
                    field,
                    std::slice::from_ref(entry),
                    Severity::Error,
                );
            }
        }
        for condition in &relationship.conditions {
            checker.text(
                EntityKind::Relationship,
                &name,
                "relationship_conditions",
                condition,
            );
        }
    }

    for (i, filter) in defs.filters.iter().enumerate() {
        let name = display_name(&filter.name, EntityKind::Filter, i);
        checker.entries(EntityKind::Filter, &name, "tables", &filter.tables, Severity::Error);
        checker.text(EntityKind::Filter, &name, "expr", &filter.expr);
    }

    for (i, query) in defs.verified_queries.iter().enumerate() {
        let name = display_name(&query.name, EntityKind::VerifiedQuery, i);
        checker.entries(
            EntityKind::VerifiedQuery,
            &name,
            "tables",
            &query.tables,
            Severity::Warning,
        );
    }

    for (i, view) in defs.views.iter().enumerate() {
        let name = display_name(&view.name, EntityKind::SemanticView, i);
        checker.entries(EntityKind::SemanticView, &name, "tables", &view.tables, Severity::Error);
        for entry in &view.custom_instructions {
            if let Err(err) = ctx.resolver.resolve_instruction_entry(entry) {
                checker.entry_error(
                    EntityKind::SemanticView,
                    &name,
                    "custom_instructions",
                    err,
                    Severity::Error,
                );
            }
        }
    }

    checker.findings
}

impl Checker<'_, '_> {
    fn entries(
        &mut self,
        kind: EntityKind,
        name: &str,
        field: &str,
        entries: &[String],
        severity: Severity,
    ) {
        for entry in entries {
            if let Err(err) = self.ctx.resolver.resolve_table_entry(entry) {
                self.entry_error(kind, name, field, err, severity);
            }
        }
    }

    fn entry_error(
        &mut self,
        kind: EntityKind,
        name: &str,
        field: &str,
        err: EntryError,
        severity: Severity,
    ) {
        match err {
            EntryError::Syntax(errors) => {
                for error in errors {
                    self.findings.push(Finding::new(
                        RULE,
                        severity,
                        kind,
                        name,
                        format!("{}: {}", field, error),
                    ));
                }
            }
            EntryError::Unresolved(unresolved) => {
                let message = format!("{}: {}", field, unresolved);
                self.findings.push(
                    Finding::new(RULE, severity, kind, name, message)
                        .with_suggestions(unresolved.suggestions),
                );
            }
        }
    }

    fn text(&mut self, kind: EntityKind, name: &str, field: &str, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        let resolution = self.ctx.resolver.resolve(&EntityId::new(kind, name), text);

        for error in &resolution.syntax_errors {
            self.findings
                .push(Finding::error(RULE, kind, name, format!("{}: {}", field, error)));
        }
        for unresolved in &resolution.unresolved {
            self.findings.push(
                Finding::error(RULE, kind, name, format!("{}: {}", field, unresolved))
                    .with_suggestions(unresolved.suggestions.clone()),
            );
        }
        for target in resolution.targets() {
            if let Target::Metric { name: metric, .. } = target {
                if self.metric_counts.get(&identity_key(metric)).copied().unwrap_or(0) > 1 {
                    self.findings.push(Finding::error(
                        RULE,
                        kind,
                        name,
                        format!(
                            "{}: metric '{}' is defined more than once, so the reference is ambiguous",
                            field, metric
                        ),
                    ));
                }
            }
        }
    }
}
