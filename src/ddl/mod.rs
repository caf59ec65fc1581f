//! DDL Synthesizer: one `CREATE OR REPLACE SEMANTIC VIEW` per view.
//!
//! Synthesis only runs on validated input. The view, everything it reaches in
//! the entity graph and every column of its tables must be free of blocking
//! findings; otherwise [`synthesize`] fails without producing any text.
//!
//! Output is a pure function of the catalog, the definitions and the options:
//!
//! - tables follow the view's declaration order,
//! - facts and dimensions follow catalog column order within each table,
//! - relationships, metrics and filters follow definition order.

pub mod extension;
pub mod statement;

use std::collections::HashSet;

pub use extension::ca_extension;
pub use statement::{
    quote_literal, CreateSemanticView, ExpressionClause, JoinColumn, RelationshipClause,
    TableClause,
};

use crate::catalog::{CatalogColumn, CatalogTable, ColumnKind};
use crate::definitions::{EntityId, EntityKind, SemanticView};
use crate::names::sql_identifier;
use crate::resolver::Target;
use crate::template::{parse_condition, JoinOperand};
use crate::validation::{ModelContext, ValidationReport};

/// Where the view is created and which database its tables are read from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesisOptions {
    /// Database of the created view.
    pub database: Option<String>,
    /// Schema of the created view.
    pub schema: Option<String>,
    /// Replace every table's database, keeping schema and table name.
    pub location_override: Option<String>,
}

impl SynthesisOptions {
    pub fn with_target(mut self, database: impl Into<String>, schema: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self.schema = Some(schema.into());
        self
    }

    pub fn with_location_override(mut self, database: impl Into<String>) -> Self {
        self.location_override = Some(database.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    #[error("semantic view '{0}' is not defined")]
    UnknownView(String),

    #[error("semantic view '{view}' has not passed validation; blocked: {}", .blocked.join(", "))]
    Unvalidated { view: String, blocked: Vec<String> },

    #[error("table '{table}' has no physical location")]
    MissingLocation { table: String },

    #[error("{entity} has an unresolved reference")]
    Unresolved { entity: String },

    #[error("metric '{metric}' expands into itself")]
    CyclicMetric { metric: String },

    #[error("failed to encode sample values: {0}")]
    Extension(String),
}

/// Synthesize the DDL for one view.
pub fn synthesize(
    view_name: &str,
    ctx: &ModelContext<'_>,
    report: &ValidationReport,
    options: &SynthesisOptions,
) -> Result<String, SynthesisError> {
    let view = ctx
        .definitions
        .view(view_name)
        .ok_or_else(|| SynthesisError::UnknownView(view_name.to_string()))?;
    let view_id = EntityId::new(EntityKind::SemanticView, &view.name);
    if !ctx.graph.contains(&view_id) {
        return Err(SynthesisError::UnknownView(view_name.to_string()));
    }

    let tables = view_tables(ctx, view);
    check_validated(ctx, report, view, &view_id, &tables)?;

    let synthesizer = Synthesizer {
        ctx,
        view,
        view_id,
        tables,
        options,
    };
    let statement = synthesizer.statement()?;
    let sql = statement.to_sql();

    tracing::debug!(
        view = %view.name,
        tables = statement.tables.len(),
        metrics = statement.metrics.len(),
        bytes = sql.len(),
        "semantic view synthesized"
    );
    Ok(sql)
}

/// Resolved view tables in declaration order, without repeats.
fn view_tables<'a>(ctx: &ModelContext<'a>, view: &SemanticView) -> Vec<&'a CatalogTable> {
    let mut seen = HashSet::new();
    ctx.resolver
        .resolve_tables(&view.tables)
        .into_iter()
        .filter(|t| seen.insert(t.key()))
        .collect()
}

fn check_validated(
    ctx: &ModelContext<'_>,
    report: &ValidationReport,
    view: &SemanticView,
    view_id: &EntityId,
    tables: &[&CatalogTable],
) -> Result<(), SynthesisError> {
    let mut ids = vec![view_id.clone()];
    ids.extend(
        ctx.graph
            .closure(view_id)
            .into_iter()
            .filter(|id| id.kind != EntityKind::VerifiedQuery),
    );
    for table in tables {
        ids.push(EntityId::new(EntityKind::Table, &table.name));
        ids.extend(
            table
                .columns()
                .iter()
                .map(|c| EntityId::column(&table.name, &c.name)),
        );
    }

    let mut blocked: Vec<String> = report
        .blocking()
        .filter(|f| matches!(f.kind, EntityKind::Catalog | EntityKind::Source))
        .map(|f| f.entity_id().to_string())
        .collect();
    for id in ids {
        if report.is_blocked(&id) {
            blocked.push(id.to_string());
        }
    }
    blocked.sort();
    blocked.dedup();

    if blocked.is_empty() {
        Ok(())
    } else {
        Err(SynthesisError::Unvalidated {
            view: view.name.clone(),
            blocked,
        })
    }
}

// ============================================================================
// Statement assembly
// ============================================================================

struct Synthesizer<'s, 'a> {
    ctx: &'s ModelContext<'a>,
    view: &'s SemanticView,
    view_id: EntityId,
    tables: Vec<&'a CatalogTable>,
    options: &'s SynthesisOptions,
}

impl Synthesizer<'_, '_> {
    fn statement(&self) -> Result<CreateSemanticView, SynthesisError> {
        let mut statement = CreateSemanticView::new(self.view_name());

        for table in &self.tables {
            statement.tables.push(self.table_clause(table)?);
            for (kind, column) in ordered_columns(table) {
                let clause = ExpressionClause::new(
                    sql_identifier(&table.name),
                    sql_identifier(&column.name),
                    sql_identifier(&column.name),
                )
                .synonyms(column.synonyms.clone())
                .comment(non_blank(column.description.as_deref()));
                match kind {
                    ColumnKind::Fact => statement.facts.push(clause),
                    ColumnKind::Dimension | ColumnKind::TimeDimension => {
                        statement.dimensions.push(clause)
                    }
                }
            }
        }

        let defs = self.ctx.definitions;
        let relationships = defs.relationships.iter().map(|r| &r.name);
        for index in self.members(EntityKind::Relationship, relationships) {
            statement.relationships.push(self.relationship_clause(index)?);
        }
        for index in self.members(EntityKind::Metric, defs.metrics.iter().map(|m| &m.name)) {
            let metric = &defs.metrics[index];
            let expr = self.expand_metric(index, &mut Vec::new())?;
            statement.metrics.push(
                ExpressionClause::new(
                    self.alias_for(&metric.tables),
                    sql_identifier(&metric.name),
                    expr,
                )
                    .synonyms(metric.synonyms.clone())
                    .comment(non_blank(metric.description.as_deref())),
            );
        }
        for index in self.members(EntityKind::Filter, defs.filters.iter().map(|f| &f.name)) {
            let filter = &defs.filters[index];
            let id = EntityId::new(EntityKind::Filter, &filter.name);
            let expr = self.expand(&id, &filter.expr, &mut Vec::new())?;
            statement.filters.push(
                ExpressionClause::new(
                    self.alias_for(&filter.tables),
                    sql_identifier(&filter.name),
                    expr,
                )
                    .synonyms(filter.synonyms.clone())
                    .comment(non_blank(filter.description.as_deref())),
            );
        }

        statement.comment = non_blank(self.view.description.as_deref());
        let (sql_generation, categorization) = self.guidance()?;
        statement.sql_generation = sql_generation;
        statement.question_categorization = categorization;
        statement.extension = ca_extension(&self.tables)
            .map_err(|e| SynthesisError::Extension(e.to_string()))?;

        Ok(statement)
    }

    fn view_name(&self) -> String {
        let name = sql_identifier(&self.view.name);
        match (&self.options.database, &self.options.schema) {
            (Some(db), Some(schema)) => format!(
                "{}.{}.{}",
                sql_identifier(db),
                sql_identifier(schema),
                name
            ),
            (None, Some(schema)) => format!("{}.{}", sql_identifier(schema), name),
            _ => name,
        }
    }

    fn table_clause(&self, table: &CatalogTable) -> Result<TableClause, SynthesisError> {
        let location = table
            .location
            .as_ref()
            .ok_or_else(|| SynthesisError::MissingLocation {
                table: table.name.clone(),
            })?;
        let location = match &self.options.location_override {
            Some(database) => location.with_database(database),
            None => location.clone(),
        };
        let qualified = format!(
            "{}.{}.{}",
            sql_identifier(&location.database),
            sql_identifier(&location.schema),
            sql_identifier(&location.table)
        );

        let mut clause = TableClause::new(sql_identifier(&table.name), qualified)
            .primary_key(table.primary_key.iter().map(|c| sql_identifier(c)).collect())
            .synonyms(table.synonyms.clone())
            .comment(non_blank(table.description.as_deref()));
        for unique in &table.unique_keys {
            clause = clause.unique(unique.iter().map(|c| sql_identifier(c)).collect());
        }
        Ok(clause)
    }

    /// Definition indexes of the view's members of `kind`, in definition
    /// order. Only the first definition of a name is a graph node.
    fn members<'n>(
        &self,
        kind: EntityKind,
        names: impl Iterator<Item = &'n String>,
    ) -> Vec<usize> {
        let members: HashSet<EntityId> = self
            .ctx
            .graph
            .members(&self.view_id, kind)
            .into_iter()
            .map(|n| n.id.clone())
            .collect();
        let mut seen = HashSet::new();
        names
            .enumerate()
            .filter(|(_, name)| !name.trim().is_empty())
            .filter_map(|(i, name)| {
                let id = EntityId::new(kind, name);
                (members.contains(&id) && seen.insert(id)).then_some(i)
            })
            .collect()
    }

    /// Alias of the first resolvable table in `entries`, else the view's
    /// first table.
    fn alias_for(&self, entries: &[String]) -> String {
        self.ctx
            .resolver
            .resolve_tables(entries)
            .first()
            .or_else(|| self.tables.first())
            .map(|t| sql_identifier(&t.name))
            .unwrap_or_default()
    }

    fn relationship_clause(&self, index: usize) -> Result<RelationshipClause, SynthesisError> {
        let relationship = &self.ctx.definitions.relationships[index];
        let unresolved = || SynthesisError::Unresolved {
            entity: EntityId::new(EntityKind::Relationship, &relationship.name).to_string(),
        };
        let left = self
            .ctx
            .resolver
            .resolve_table_entry(&relationship.left_table)
            .map_err(|_| unresolved())?;
        let right = self
            .ctx
            .resolver
            .resolve_table_entry(&relationship.right_table)
            .map_err(|_| unresolved())?;

        let mut pairs = Vec::with_capacity(relationship.conditions.len());
        for raw in &relationship.conditions {
            let condition = parse_condition(raw).map_err(|_| unresolved())?;
            let (
                JoinOperand::Column {
                    column: left_column,
                    ..
                },
                JoinOperand::Column {
                    column: right_column,
                    ..
                },
            ) = (&condition.left, &condition.right)
            else {
                return Err(unresolved());
            };
            pairs.push((
                sql_identifier(left_column),
                JoinColumn {
                    name: sql_identifier(right_column),
                    asof: condition.operator.is_asof(),
                },
            ));
        }

        // The as-of pair must come last on both sides; validation allows at
        // most one.
        pairs.sort_by_key(|(_, column)| column.asof);
        let (left_columns, right_columns) = pairs.into_iter().unzip();
        Ok(RelationshipClause {
            name: sql_identifier(&relationship.name),
            left_alias: sql_identifier(&left.name),
            left_columns,
            right_alias: sql_identifier(&right.name),
            right_columns,
        })
    }

    /// Expand a metric's expression, inlining referenced metrics.
    fn expand_metric(
        &self,
        index: usize,
        stack: &mut Vec<usize>,
    ) -> Result<String, SynthesisError> {
        let metric = &self.ctx.definitions.metrics[index];
        if stack.contains(&index) {
            return Err(SynthesisError::CyclicMetric {
                metric: metric.name.clone(),
            });
        }
        stack.push(index);
        let id = EntityId::new(EntityKind::Metric, &metric.name);
        let expanded = self.expand(&id, &metric.expr, stack);
        stack.pop();
        expanded
    }

    fn expand(
        &self,
        owner: &EntityId,
        text: &str,
        stack: &mut Vec<usize>,
    ) -> Result<String, SynthesisError> {
        let unresolved = || SynthesisError::Unresolved {
            entity: owner.to_string(),
        };
        let resolution = self.ctx.resolver.resolve(owner, text);
        let template = resolution.template.as_ref().ok_or_else(unresolved)?;

        let rendered = template.render(|marker| -> Result<String, SynthesisError> {
            match resolution.target_at(marker.span) {
                Some(Target::Table { table }) => Ok(sql_identifier(table)),
                Some(Target::Column { table, column }) => Ok(format!(
                    "{}.{}",
                    sql_identifier(table),
                    sql_identifier(column)
                )),
                Some(Target::Metric { index, .. }) => {
                    Ok(format!("({})", self.expand_metric(*index, stack)?))
                }
                Some(Target::Instruction { .. }) | None => Err(unresolved()),
            }
        })?;
        Ok(rendered.trim().to_string())
    }

    /// AI guidance from the view's custom instructions, joined per field.
    fn guidance(&self) -> Result<(Option<String>, Option<String>), SynthesisError> {
        let mut sql_generation = Vec::new();
        let mut categorization = Vec::new();
        for entry in &self.view.custom_instructions {
            let instruction = self
                .ctx
                .resolver
                .resolve_instruction_entry(entry)
                .map_err(|_| SynthesisError::Unresolved {
                    entity: EntityId::new(EntityKind::SemanticView, &self.view.name).to_string(),
                })?;
            if let Some(text) = non_blank(instruction.sql_generation.as_deref()) {
                sql_generation.push(text);
            }
            if let Some(text) = non_blank(instruction.question_categorization.as_deref()) {
                categorization.push(text);
            }
        }
        let join = |parts: Vec<String>| (!parts.is_empty()).then(|| parts.join("\n"));
        Ok((join(sql_generation), join(categorization)))
    }
}

/// Classified columns of a table: dimensions, then time dimensions, then
/// facts, each in catalog order. Unclassified columns are dimensions.
fn ordered_columns(table: &CatalogTable) -> Vec<(ColumnKind, &CatalogColumn)> {
    let kind_of = |c: &CatalogColumn| c.kind().unwrap_or(ColumnKind::Dimension);
    let mut columns = Vec::new();
    for wanted in [
        ColumnKind::Dimension,
        ColumnKind::TimeDimension,
        ColumnKind::Fact,
    ] {
        columns.extend(
            table
                .columns()
                .iter()
                .filter(|c| kind_of(*c) == wanted)
                .map(|c| (wanted, c)),
        );
    }
    columns
}

fn non_blank(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
