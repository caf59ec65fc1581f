//! Definition names must be usable as Snowflake identifiers.

use std::sync::LazyLock;

use inflector::Inflector;
use regex::Regex;

use crate::definitions::EntityKind;
use crate::validation::{Finding, ModelContext};

pub(super) const RULE: &str = "identifiers";

/// Hard identifier length limit in Snowflake.
pub const MAX_IDENTIFIER_LENGTH: usize = 255;
/// Names longer than this still work but are unwieldy in generated SQL.
pub const RECOMMENDED_IDENTIFIER_LENGTH: usize = 200;

static VALID_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

static INVALID_CHARACTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]+").unwrap());

const RESERVED_KEYWORDS: &[&str] = &[
    "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "BETWEEN", "BY", "CASE", "CAST", "CHECK",
    "COLUMN", "CONNECT", "CREATE", "CROSS", "CURRENT", "CURRENT_DATE", "CURRENT_TIME",
    "CURRENT_TIMESTAMP", "CURRENT_USER", "DATABASE", "DATE", "DELETE", "DESC", "DISTINCT",
    "DROP", "ELSE", "END", "EXISTS", "FALSE", "FOLLOWING", "FOR", "FROM", "FULL", "GRANT",
    "GROUP", "HAVING", "ILIKE", "IN", "INCREMENT", "INNER", "INSERT", "INTERSECT", "INTO",
    "IS", "JOIN", "LATERAL", "LEFT", "LIKE", "LIMIT", "MINUS", "NATURAL", "NOT", "NULL", "OF",
    "ON", "OR", "ORDER", "QUALIFY", "REGEXP", "REVOKE", "RIGHT", "RLIKE", "ROW", "ROWS",
    "SAMPLE", "SCHEMA", "SELECT", "SET", "SOME", "START", "TABLE", "TABLESAMPLE", "THEN",
    "TIME", "TIMESTAMP", "TO", "TRIGGER", "TRUE", "TRY_CAST", "UNION", "UNIQUE", "UPDATE",
    "USING", "VALUES", "VIEW", "WHEN", "WHENEVER", "WHERE", "WITH",
];

pub fn is_reserved_keyword(name: &str) -> bool {
    let upper = name.trim().to_uppercase();
    RESERVED_KEYWORDS.contains(&upper.as_str())
}

/// Closest valid identifier to `name`.
pub fn suggest_identifier(name: &str) -> String {
    let snake = name.trim().to_snake_case();
    let mut cleaned = INVALID_CHARACTER.replace_all(&snake, "_").into_owned();
    if cleaned.is_empty() {
        cleaned.push('_');
    }
    if cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        cleaned.insert(0, '_');
    }
    cleaned
}

pub(super) fn check(ctx: &ModelContext<'_>) -> Vec<Finding> {
    let defs = ctx.definitions;
    let names = defs
        .metrics
        .iter()
        .map(|m| (EntityKind::Metric, m.name.as_str()))
        .chain(
            defs.relationships
                .iter()
                .map(|r| (EntityKind::Relationship, r.name.as_str())),
        )
        .chain(defs.filters.iter().map(|f| (EntityKind::Filter, f.name.as_str())))
        .chain(
            defs.views
                .iter()
                .map(|v| (EntityKind::SemanticView, v.name.as_str())),
        );

    let mut findings = Vec::new();
    for (kind, name) in names {
        let name = name.trim();
        if !name.is_empty() {
            check_name(kind, name, &mut findings);
        }
    }
    findings
}

fn check_name(kind: EntityKind, name: &str, findings: &mut Vec<Finding>) {
    let length = name.chars().count();
    if length > MAX_IDENTIFIER_LENGTH {
        findings.push(Finding::error(
            RULE,
            kind,
            name,
            format!(
                "name is {} characters and exceeds Snowflake's {}-character limit",
                length, MAX_IDENTIFIER_LENGTH
            ),
        ));
    } else if length > RECOMMENDED_IDENTIFIER_LENGTH {
        findings.push(Finding::warning(
            RULE,
            kind,
            name,
            format!(
                "name is {} characters, longer than recommended ({})",
                length, RECOMMENDED_IDENTIFIER_LENGTH
            ),
        ));
    }

    if !VALID_IDENTIFIER.is_match(name) {
        findings.push(
            Finding::error(
                RULE,
                kind,
                name,
                "name contains invalid characters; use letters, digits and underscores, \
                 starting with a letter or underscore",
            )
            .with_suggestions(vec![suggest_identifier(name)]),
        );
    }

    if is_reserved_keyword(name) {
        findings.push(Finding::warning(
            RULE,
            kind,
            name,
            format!("'{}' is a SQL reserved keyword and must be quoted in queries", name),
        ));
    }
}
