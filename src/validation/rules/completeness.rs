//! Advisory checks for documentation that helps the consumers of a view.

use super::display_name;
use crate::definitions::EntityKind;
use crate::validation::{Finding, ModelContext};

pub(super) const RULE: &str = "completeness";

fn blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

pub(super) fn check(ctx: &ModelContext<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut warn = |kind: EntityKind, name: &str, message: &str| {
        findings.push(Finding::warning(RULE, kind, name, message));
    };

    for table in ctx.catalog.tables() {
        if table.metadata_source.is_none() {
            continue;
        }
        if blank(table.description.as_deref()) {
            warn(EntityKind::Table, &table.name, "missing description");
        }
        if table.synonyms.is_empty() {
            warn(EntityKind::Table, &table.name, "no synonyms");
        }
        if table.primary_key.is_empty() {
            warn(EntityKind::Table, &table.name, "no primary key declared");
        }
        for column in table.columns() {
            if column.column_type.is_some() && blank(column.description.as_deref()) {
                warn(
                    EntityKind::Column,
                    &format!("{}.{}", table.name, column.name),
                    "missing description",
                );
            }
        }
    }

    let defs = ctx.definitions;
    for (i, metric) in defs.metrics.iter().enumerate() {
        let name = display_name(&metric.name, EntityKind::Metric, i);
        if blank(metric.description.as_deref()) {
            warn(EntityKind::Metric, &name, "missing description");
        }
        if metric.synonyms.is_empty() {
            warn(EntityKind::Metric, &name, "no synonyms");
        }
    }
    for (i, filter) in defs.filters.iter().enumerate() {
        if blank(filter.description.as_deref()) {
            let name = display_name(&filter.name, EntityKind::Filter, i);
            warn(EntityKind::Filter, &name, "missing description");
        }
    }
    for (i, view) in defs.views.iter().enumerate() {
        if blank(view.description.as_deref()) {
            let name = display_name(&view.name, EntityKind::SemanticView, i);
            warn(EntityKind::SemanticView, &name, "missing description");
        }
    }

    findings
}
