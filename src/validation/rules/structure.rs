//! Required fields, guidance text, date formats and bracket balance.

use std::sync::LazyLock;

use regex::Regex;

use super::display_name;
use crate::definitions::{EntityKind, RELATIONSHIP_FIELDS};
use crate::validation::{Finding, ModelContext};

pub(super) const RULE: &str = "structure";

/// Shortest guidance text that is likely to be useful.
const MIN_GUIDANCE_LENGTH: usize = 10;

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

pub(super) fn check(ctx: &ModelContext<'_>) -> Vec<Finding> {
    let defs = ctx.definitions;
    let mut findings = Vec::new();

    let mut require = |kind: EntityKind, name: &str, field: &str, present: bool| {
        if !present {
            findings.push(Finding::error(
                RULE,
                kind,
                name,
                format!("missing required field '{}'", field),
            ));
        }
    };

    for (i, metric) in defs.metrics.iter().enumerate() {
        let name = display_name(&metric.name, EntityKind::Metric, i);
        require(EntityKind::Metric, &name, "expr", !metric.expr.trim().is_empty());
        require(EntityKind::Metric, &name, "tables", !metric.tables.is_empty());
    }
    for (i, relationship) in defs.relationships.iter().enumerate() {
        let name = display_name(&relationship.name, EntityKind::Relationship, i);
        require(
            EntityKind::Relationship,
            &name,
            "left_table",
            !relationship.left_table.trim().is_empty(),
        );
        require(
            EntityKind::Relationship,
            &name,
            "right_table",
            !relationship.right_table.trim().is_empty(),
        );
        require(
            EntityKind::Relationship,
            &name,
            "relationship_conditions",
            !relationship.conditions.is_empty(),
        );
    }
    for (i, filter) in defs.filters.iter().enumerate() {
        let name = display_name(&filter.name, EntityKind::Filter, i);
        require(EntityKind::Filter, &name, "expr", !filter.expr.trim().is_empty());
    }
    for (i, view) in defs.views.iter().enumerate() {
        let name = display_name(&view.name, EntityKind::SemanticView, i);
        require(EntityKind::SemanticView, &name, "tables", !view.tables.is_empty());
    }
    for (i, query) in defs.verified_queries.iter().enumerate() {
        let name = display_name(&query.name, EntityKind::VerifiedQuery, i);
        require(
            EntityKind::VerifiedQuery,
            &name,
            "question",
            !query.question.trim().is_empty(),
        );
        require(EntityKind::VerifiedQuery, &name, "sql", !query.sql.trim().is_empty());
    }

    for (i, query) in defs.verified_queries.iter().enumerate() {
        if let Some(date) = query.verified_at.as_deref() {
            if !ISO_DATE.is_match(date.trim()) {
                findings.push(Finding::warning(
                    RULE,
                    EntityKind::VerifiedQuery,
                    display_name(&query.name, EntityKind::VerifiedQuery, i),
                    format!("verified_at '{}' is not a YYYY-MM-DD date", date),
                ));
            }
        }
    }

    for (i, instruction) in defs.custom_instructions.iter().enumerate() {
        let name = display_name(&instruction.name, EntityKind::CustomInstruction, i);
        let guidance: Vec<&str> = instruction.guidance().collect();
        if guidance.is_empty() {
            findings.push(Finding::error(
                RULE,
                EntityKind::CustomInstruction,
                &name,
                "needs at least one of 'question_categorization' or 'sql_generation'",
            ));
        }
        for text in guidance {
            if text.trim().chars().count() < MIN_GUIDANCE_LENGTH {
                findings.push(Finding::warning(
                    RULE,
                    EntityKind::CustomInstruction,
                    &name,
                    format!("guidance '{}' is too short to be useful", text.trim()),
                ));
            }
        }
    }

    for (i, metric) in defs.metrics.iter().enumerate() {
        if let Some(problem) = bracket_problem(&metric.expr) {
            findings.push(Finding::error(
                RULE,
                EntityKind::Metric,
                display_name(&metric.name, EntityKind::Metric, i),
                format!("expr has {}", problem),
            ));
        }
    }
    for (i, filter) in defs.filters.iter().enumerate() {
        if let Some(problem) = bracket_problem(&filter.expr) {
            findings.push(Finding::error(
                RULE,
                EntityKind::Filter,
                display_name(&filter.name, EntityKind::Filter, i),
                format!("expr has {}", problem),
            ));
        }
    }

    for (i, relationship) in defs.relationships.iter().enumerate() {
        for field in relationship.extra.keys() {
            if RELATIONSHIP_FIELDS.contains(&field.as_str()) {
                continue;
            }
            findings.push(Finding::warning(
                RULE,
                EntityKind::Relationship,
                display_name(&relationship.name, EntityKind::Relationship, i),
                format!("unknown field '{}' is ignored", field),
            ));
        }
    }

    findings
}

/// Describe the first bracket mismatch in `expr`, ignoring quoted text.
fn bracket_problem(expr: &str) -> Option<String> {
    let mut stack = Vec::new();
    let mut quote: Option<char> = None;

    for c in expr.chars() {
        if let Some(open) = quote {
            if c == open {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => stack.push(c),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if stack.pop() != Some(expected) {
                    return Some(format!("unbalanced '{}'", c));
                }
            }
            _ => {}
        }
    }

    if quote.is_some() {
        return Some("an unterminated quoted string".to_string());
    }
    stack.last().map(|open| format!("unclosed '{}'", open))
}
