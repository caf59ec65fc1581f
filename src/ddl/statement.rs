//! `CREATE SEMANTIC VIEW` statement model and rendering.
//!
//! The synthesizer fills in a [`CreateSemanticView`]; rendering is a pure
//! function of that value. Identifiers are expected to be final (already
//! uppercased); string literals are quoted here.

use std::fmt::Write;

/// Quote a string literal, doubling single quotes.
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn synonyms_clause(synonyms: &[String]) -> String {
    let quoted: Vec<String> = synonyms.iter().map(|s| quote_literal(s)).collect();
    format!(" WITH SYNONYMS = ({})", quoted.join(", "))
}

fn comment_clause(comment: &str) -> String {
    format!(" COMMENT = {}", quote_literal(comment))
}

// ============================================================================
// Clauses
// ============================================================================

/// One entry of the `TABLES` group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableClause {
    pub alias: String,
    /// `DB.SCHEMA.TABLE`.
    pub location: String,
    pub primary_key: Vec<String>,
    pub unique_keys: Vec<Vec<String>>,
    pub synonyms: Vec<String>,
    pub comment: Option<String>,
}

impl TableClause {
    pub fn new(alias: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            location: location.into(),
            primary_key: Vec::new(),
            unique_keys: Vec::new(),
            synonyms: Vec::new(),
            comment: None,
        }
    }

    pub fn primary_key(mut self, columns: Vec<String>) -> Self {
        self.primary_key = columns;
        self
    }

    pub fn unique(mut self, columns: Vec<String>) -> Self {
        if !columns.is_empty() {
            self.unique_keys.push(columns);
        }
        self
    }

    pub fn synonyms(mut self, synonyms: Vec<String>) -> Self {
        self.synonyms = synonyms;
        self
    }

    pub fn comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }

    fn to_sql(&self) -> String {
        let mut sql = format!("{} AS {}", self.alias, self.location);
        if !self.primary_key.is_empty() {
            let _ = write!(sql, " PRIMARY KEY ({})", self.primary_key.join(", "));
        }
        for unique in &self.unique_keys {
            let _ = write!(sql, " UNIQUE ({})", unique.join(", "));
        }
        if !self.synonyms.is_empty() {
            sql.push_str(&synonyms_clause(&self.synonyms));
        }
        if let Some(comment) = &self.comment {
            sql.push_str(&comment_clause(comment));
        }
        sql
    }
}

/// A right-hand join column, optionally the as-of column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinColumn {
    pub name: String,
    pub asof: bool,
}

/// One entry of the `RELATIONSHIPS` group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipClause {
    pub name: String,
    pub left_alias: String,
    pub left_columns: Vec<String>,
    pub right_alias: String,
    pub right_columns: Vec<JoinColumn>,
}

impl RelationshipClause {
    fn to_sql(&self) -> String {
        let right: Vec<String> = self
            .right_columns
            .iter()
            .map(|c| {
                if c.asof {
                    format!("ASOF {}", c.name)
                } else {
                    c.name.clone()
                }
            })
            .collect();
        format!(
            "{} AS {} ({}) REFERENCES {} ({})",
            self.name,
            self.left_alias,
            self.left_columns.join(", "),
            self.right_alias,
            right.join(", ")
        )
    }
}

/// A fact, dimension, metric or filter: `TABLE.NAME AS expr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionClause {
    pub table_alias: String,
    pub name: String,
    pub expr: String,
    pub synonyms: Vec<String>,
    pub comment: Option<String>,
}

impl ExpressionClause {
    pub fn new(
        table_alias: impl Into<String>,
        name: impl Into<String>,
        expr: impl Into<String>,
    ) -> Self {
        Self {
            table_alias: table_alias.into(),
            name: name.into(),
            expr: expr.into(),
            synonyms: Vec::new(),
            comment: None,
        }
    }

    pub fn synonyms(mut self, synonyms: Vec<String>) -> Self {
        self.synonyms = synonyms;
        self
    }

    pub fn comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }

    fn to_sql(&self) -> String {
        let mut sql = format!("{}.{} AS {}", self.table_alias, self.name, self.expr);
        if !self.synonyms.is_empty() {
            sql.push_str(&synonyms_clause(&self.synonyms));
        }
        if let Some(comment) = &self.comment {
            sql.push_str(&comment_clause(comment));
        }
        sql
    }
}

// ============================================================================
// CREATE SEMANTIC VIEW
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use = "statements have no effect until rendered with to_sql()"]
pub struct CreateSemanticView {
    /// Fully qualified or bare view name.
    pub name: String,
    pub tables: Vec<TableClause>,
    pub relationships: Vec<RelationshipClause>,
    pub facts: Vec<ExpressionClause>,
    pub dimensions: Vec<ExpressionClause>,
    pub metrics: Vec<ExpressionClause>,
    pub filters: Vec<ExpressionClause>,
    pub comment: Option<String>,
    pub sql_generation: Option<String>,
    pub question_categorization: Option<String>,
    /// Already escaped CA extension JSON.
    pub extension: Option<String>,
}

impl CreateSemanticView {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn to_sql(&self) -> String {
        let mut lines = vec![format!("CREATE OR REPLACE SEMANTIC VIEW {}", self.name)];

        push_group(
            &mut lines,
            "TABLES",
            self.tables.iter().map(TableClause::to_sql).collect(),
        );
        push_group(
            &mut lines,
            "RELATIONSHIPS",
            self.relationships
                .iter()
                .map(RelationshipClause::to_sql)
                .collect(),
        );
        for (keyword, clauses) in [
            ("FACTS", &self.facts),
            ("DIMENSIONS", &self.dimensions),
            ("METRICS", &self.metrics),
            ("FILTERS", &self.filters),
        ] {
            push_group(
                &mut lines,
                keyword,
                clauses.iter().map(ExpressionClause::to_sql).collect(),
            );
        }

        if let Some(comment) = &self.comment {
            lines.push(format!("  COMMENT = {}", quote_literal(comment)));
        }
        if let Some(guidance) = &self.sql_generation {
            lines.push(format!("  AI_SQL_GENERATION {}", quote_literal(guidance)));
        }
        if let Some(guidance) = &self.question_categorization {
            lines.push(format!(
                "  AI_QUESTION_CATEGORIZATION {}",
                quote_literal(guidance)
            ));
        }
        if let Some(extension) = &self.extension {
            lines.push(format!("  WITH EXTENSION (CA='{}')", extension));
        }

        let mut sql = lines.join("\n");
        sql.push(';');
        sql
    }
}

fn push_group(lines: &mut Vec<String>, keyword: &str, entries: Vec<String>) {
    if entries.is_empty() {
        return;
    }
    lines.push(format!("  {} (", keyword));
    let last = entries.len() - 1;
    for (i, entry) in entries.into_iter().enumerate() {
        let separator = if i == last { "" } else { "," };
        lines.push(format!("    {}{}", entry, separator));
    }
    lines.push("  )".to_string());
}
