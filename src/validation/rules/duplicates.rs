//! Things defined twice under different names, or twice in the catalog.

use std::collections::{BTreeSet, HashMap};

use crate::definitions::EntityKind;
use crate::names::normalize;
use crate::validation::{Finding, ModelContext};

pub(super) const RULE: &str = "duplicates";

pub(super) fn check(ctx: &ModelContext<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();

    for duplicate in ctx.catalog.duplicates() {
        findings.push(Finding::error(
            RULE,
            EntityKind::Table,
            &duplicate.table,
            format!(
                "table is described in more than one metadata block: {}",
                duplicate.sources.join(", ")
            ),
        ));
    }

    metric_expressions(ctx, &mut findings);
    relationship_pairs(ctx, &mut findings);
    view_shapes(ctx, &mut findings);
    view_synonyms(ctx, &mut findings);

    findings
}

fn collapse(expr: &str) -> String {
    expr.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn metric_expressions(ctx: &ModelContext<'_>, findings: &mut Vec<Finding>) {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for metric in &ctx.definitions.metrics {
        if metric.name.trim().is_empty() || metric.expr.trim().is_empty() {
            continue;
        }
        match seen.get(&collapse(&metric.expr)) {
            Some(first) => findings.push(Finding::warning(
                RULE,
                EntityKind::Metric,
                metric.name.trim(),
                format!("has the same expression as metric '{}'", first),
            )),
            None => {
                seen.insert(collapse(&metric.expr), metric.name.trim());
            }
        }
    }
}

fn relationship_pairs(ctx: &ModelContext<'_>, findings: &mut Vec<Finding>) {
    let mut seen: HashMap<(String, String), &str> = HashMap::new();
    for relationship in &ctx.definitions.relationships {
        if relationship.name.trim().is_empty() {
            continue;
        }
        let (Ok(left), Ok(right)) = (
            ctx.resolver.resolve_table_entry(&relationship.left_table),
            ctx.resolver.resolve_table_entry(&relationship.right_table),
        ) else {
            continue;
        };
        let pair = (left.key(), right.key());
        match seen.get(&pair) {
            Some(first) => findings.push(Finding::warning(
                RULE,
                EntityKind::Relationship,
                relationship.name.trim(),
                format!(
                    "joins '{}' to '{}' like relationship '{}'; only one join path is used per pair",
                    left.name, right.name, first
                ),
            )),
            None => {
                seen.insert(pair, relationship.name.trim());
            }
        }
    }
}

fn view_shapes(ctx: &ModelContext<'_>, findings: &mut Vec<Finding>) {
    let mut seen: HashMap<BTreeSet<String>, &str> = HashMap::new();
    for view in &ctx.definitions.views {
        if view.name.trim().is_empty() {
            continue;
        }
        let tables: BTreeSet<String> = ctx
            .resolver
            .resolve_tables(&view.tables)
            .iter()
            .map(|t| t.key())
            .collect();
        if tables.is_empty() {
            continue;
        }
        match seen.get(&tables) {
            Some(first) => findings.push(Finding::warning(
                RULE,
                EntityKind::SemanticView,
                view.name.trim(),
                format!("has the same tables as semantic view '{}'", first),
            )),
            None => {
                seen.insert(tables, view.name.trim());
            }
        }
    }
}

/// Two tables in one view claiming the same synonym make the synonym
/// ambiguous for the view's consumers.
fn view_synonyms(ctx: &ModelContext<'_>, findings: &mut Vec<Finding>) {
    for view in &ctx.definitions.views {
        if view.name.trim().is_empty() {
            continue;
        }
        let mut owners: HashMap<String, &str> = HashMap::new();
        for table in ctx.resolver.resolve_tables(&view.tables) {
            for synonym in &table.synonyms {
                let key = normalize(synonym);
                match owners.get(&key) {
                    Some(owner) if *owner != table.name => findings.push(Finding::error(
                        RULE,
                        EntityKind::SemanticView,
                        view.name.trim(),
                        format!(
                            "synonym '{}' is used by both '{}' and '{}'",
                            synonym, owner, table.name
                        ),
                    )),
                    Some(_) => {}
                    None => {
                        owners.insert(key, &table.name);
                    }
                }
            }
        }
    }
}
