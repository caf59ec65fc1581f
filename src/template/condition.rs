//! Relationship join conditions.
//!
//! A condition is `LEFT OP RIGHT`, where each operand is either a column
//! marker (`{{ column('orders', 'customer_id') }}`) or an already resolved
//! `TABLE.COLUMN`. The operator is located outside of markers only.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::ast::{Reference, Segment, Template};
use super::parser::{parse_template, ReferenceSyntaxError};

static RESOLVED_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_$]*)\.([A-Za-z_][A-Za-z0-9_$]*)$").unwrap()
});

static BETWEEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bBETWEEN\b").unwrap());

/// Casts, function calls, arithmetic, concatenation and CASE expressions.
static TRANSFORMATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(::|\b[A-Z_][A-Z0-9_]*\s*\(|\|\||[+\-*/%]|\bCASE\b)").unwrap()
});

/// Operators in the order they are searched for.
const OPERATORS: &[(&str, JoinOperator)] = &[
    (">=", JoinOperator::GreaterOrEqual),
    ("<=", JoinOperator::LessOrEqual),
    ("!=", JoinOperator::NotEqual),
    ("<>", JoinOperator::NotEqual),
    ("=", JoinOperator::Equal),
    (">", JoinOperator::Greater),
    ("<", JoinOperator::Less),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinOperator {
    Equal,
    GreaterOrEqual,
    LessOrEqual,
    Greater,
    Less,
    NotEqual,
    Between,
}

impl JoinOperator {
    /// Only equality and as-of (`>=`) joins can be expressed in a semantic view.
    pub fn is_supported(self) -> bool {
        matches!(self, JoinOperator::Equal | JoinOperator::GreaterOrEqual)
    }

    pub fn is_asof(self) -> bool {
        self == JoinOperator::GreaterOrEqual
    }
}

impl fmt::Display for JoinOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            JoinOperator::Equal => "=",
            JoinOperator::GreaterOrEqual => ">=",
            JoinOperator::LessOrEqual => "<=",
            JoinOperator::Greater => ">",
            JoinOperator::Less => "<",
            JoinOperator::NotEqual => "!=",
            JoinOperator::Between => "BETWEEN",
        };
        write!(f, "{}", symbol)
    }
}

/// One side of a join condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOperand {
    Column { table: String, column: String },
    /// A column wrapped in a cast, function or arithmetic.
    Transformed(String),
    /// Anything else that is not a single column.
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCondition {
    pub left: JoinOperand,
    pub operator: JoinOperator,
    pub right: JoinOperand,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConditionError {
    #[error("invalid reference syntax in condition")]
    Syntax(Vec<ReferenceSyntaxError>),

    #[error("no comparison operator found in '{0}'")]
    MissingOperator(String),
}

/// Parse one relationship condition.
pub fn parse_condition(raw: &str) -> Result<JoinCondition, ConditionError> {
    let template = parse_template(raw).map_err(ConditionError::Syntax)?;
    let masked = mask_markers(&template);

    let (position, width, operator) = find_operator(&masked)
        .ok_or_else(|| ConditionError::MissingOperator(raw.trim().to_string()))?;

    Ok(JoinCondition {
        left: parse_operand(&raw[..position], &masked[..position]),
        operator,
        right: parse_operand(&raw[position + width..], &masked[position + width..]),
    })
}

/// Replace every marker with `#` so operators and operator-like characters
/// inside quoted arguments are ignored. Byte offsets are preserved.
fn mask_markers(template: &Template) -> String {
    let mut masked = String::new();
    for segment in &template.segments {
        match segment {
            Segment::Text(text) => masked.push_str(text),
            Segment::Marker(marker) => masked.push_str(&"#".repeat(marker.span.len())),
        }
    }
    masked
}

fn find_operator(masked: &str) -> Option<(usize, usize, JoinOperator)> {
    for (symbol, operator) in OPERATORS {
        if let Some(position) = masked.find(symbol) {
            return Some((position, symbol.len(), *operator));
        }
    }
    BETWEEN
        .find(masked)
        .map(|m| (m.start(), m.len(), JoinOperator::Between))
}

fn parse_operand(raw: &str, masked: &str) -> JoinOperand {
    let text = raw.trim();

    if let Ok(template) = parse_template(raw) {
        let references: Vec<&Reference> = template.references().collect();
        if let [Reference::Column { table, column }] = references.as_slice() {
            if template.is_markers_only() {
                return JoinOperand::Column {
                    table: table.clone(),
                    column: column.clone(),
                };
            }
        }
        if references.is_empty() {
            if let Some(caps) = RESOLVED_COLUMN.captures(text) {
                return JoinOperand::Column {
                    table: caps[1].to_string(),
                    column: caps[2].to_string(),
                };
            }
        }
    }

    if TRANSFORMATION.is_match(masked) {
        JoinOperand::Transformed(text.to_string())
    } else {
        JoinOperand::Invalid(text.to_string())
    }
}
