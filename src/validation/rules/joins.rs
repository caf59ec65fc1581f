//! Relationship join conditions: supported operators, at most one as-of
//! condition, plain columns on the correct sides, and a uniqueness witness on
//! the right table.

use std::collections::BTreeSet;

use super::display_name;
use crate::catalog::CatalogTable;
use crate::definitions::{EntityKind, Relationship};
use crate::names::normalize;
use crate::resolver::suggest;
use crate::template::{parse_condition, ConditionError, JoinOperand};
use crate::validation::{Finding, ModelContext};

pub(super) const RULE: &str = "joins";

pub(super) fn check(ctx: &ModelContext<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (i, relationship) in ctx.definitions.relationships.iter().enumerate() {
        let name = display_name(&relationship.name, EntityKind::Relationship, i);
        let (Ok(left), Ok(right)) = (
            ctx.resolver.resolve_table_entry(&relationship.left_table),
            ctx.resolver.resolve_table_entry(&relationship.right_table),
        ) else {
            continue;
        };
        check_relationship(ctx, &name, relationship, left, right, &mut findings);
    }
    findings
}

fn check_relationship(
    ctx: &ModelContext<'_>,
    name: &str,
    relationship: &Relationship,
    left: &CatalogTable,
    right: &CatalogTable,
    findings: &mut Vec<Finding>,
) {
    let mut error = |message: String| {
        findings.push(Finding::error(RULE, EntityKind::Relationship, name, message));
    };

    let mut clean = !relationship.conditions.is_empty();
    let mut asof_conditions = 0;
    let mut left_columns = BTreeSet::new();
    let mut right_columns = BTreeSet::new();

    for raw in &relationship.conditions {
        let condition = match parse_condition(raw) {
            Ok(condition) => condition,
            // Marker syntax is reported by the reference rule.
            Err(ConditionError::Syntax(_)) => {
                clean = false;
                continue;
            }
            Err(err @ ConditionError::MissingOperator(_)) => {
                error(format!("condition '{}': {}", raw.trim(), err));
                clean = false;
                continue;
            }
        };

        if !condition.operator.is_supported() {
            error(format!(
                "condition '{}' uses unsupported operator '{}'; only = and >= joins are allowed",
                raw.trim(),
                condition.operator
            ));
            clean = false;
        }
        if condition.operator.is_asof() {
            asof_conditions += 1;
        }

        let (
            JoinOperand::Column {
                table: left_table,
                column: left_column,
            },
            JoinOperand::Column {
                table: right_table,
                column: right_column,
            },
        ) = (&condition.left, &condition.right)
        else {
            for operand in [&condition.left, &condition.right] {
                match operand {
                    JoinOperand::Transformed(text) => error(format!(
                        "condition '{}' applies a SQL transformation to '{}'; join on plain columns",
                        raw.trim(),
                        text
                    )),
                    JoinOperand::Invalid(text) => error(format!(
                        "condition '{}': '{}' is not a column reference",
                        raw.trim(),
                        text
                    )),
                    JoinOperand::Column { .. } => {}
                }
            }
            clean = false;
            continue;
        };

        let (left_key, right_key) = (normalize(left_table), normalize(right_table));
        if left_key != left.key() || right_key != right.key() {
            if left_key == right.key() && right_key == left.key() {
                error(format!(
                    "condition '{}' is reversed; put the '{}' column on the left and the '{}' column on the right",
                    raw.trim(),
                    left.name,
                    right.name
                ));
            } else {
                error(format!(
                    "condition '{}' must compare a '{}' column to a '{}' column",
                    raw.trim(),
                    left.name,
                    right.name
                ));
            }
            clean = false;
            continue;
        }

        // Marker operands are checked by the reference rule.
        if !raw.contains("{{") {
            for (table, column) in [(left, left_column), (right, right_column)] {
                if table.column(column).is_none() {
                    report_missing_column(&mut error, ctx, table, column);
                    clean = false;
                }
            }
        }

        for (side, seen, column) in [
            ("left", &mut left_columns, left_column),
            ("right", &mut right_columns, right_column),
        ] {
            if !seen.insert(normalize(column)) {
                error(format!(
                    "column '{}' is used more than once on the {} side",
                    column, side
                ));
                clean = false;
            }
        }
    }

    if asof_conditions > 1 {
        error(format!(
            "relationship has {} as-of (>=) conditions; at most one is allowed",
            asof_conditions
        ));
        return;
    }
    if !clean {
        return;
    }

    let witnessed = right
        .key_sets()
        .into_iter()
        .any(|key| key.into_iter().collect::<BTreeSet<_>>() == right_columns);
    if witnessed {
        return;
    }

    let columns: Vec<&str> = right_columns.iter().map(String::as_str).collect();
    if asof_conditions == 1 {
        error(format!(
            "relationship '{}' uses an as-of (>=) condition, so the right-side columns ({}) \
             must be a primary key or unique key of '{}'",
            name,
            columns.join(", "),
            right.name
        ));
    } else {
        findings.push(Finding::warning(
            RULE,
            EntityKind::Relationship,
            name,
            format!(
                "right-side columns ({}) are not a primary key or unique key of '{}'; the join may duplicate rows",
                columns.join(", "),
                right.name
            ),
        ));
    }
}

fn report_missing_column(
    error: &mut impl FnMut(String),
    ctx: &ModelContext<'_>,
    table: &CatalogTable,
    column: &str,
) {
    let suggestions = suggest(
        column,
        table.columns().iter().map(|c| c.name.as_str()),
        ctx.resolver.config(),
    );
    let mut message = format!("column '{}' not found on table '{}'", column, table.name);
    if !suggestions.is_empty() {
        let quoted: Vec<String> = suggestions.iter().map(|s| format!("'{}'", s)).collect();
        message.push_str(&format!("; did you mean {}?", quoted.join(", ")));
    }
    error(message);
}
