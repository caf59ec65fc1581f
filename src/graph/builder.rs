//! Builds the [`EntityGraph`] in three passes:
//!
//! 1. nodes for every catalog table and column and every named definition;
//! 2. `References` edges from each definition's resolved text and table lists;
//! 3. `Member` edges from each view to the relationships, metrics, filters and
//!    verified queries whose tables all belong to the view.
//!
//! When two definitions share a name only the first one gets a node.

use std::collections::BTreeSet;

use petgraph::graph::NodeIndex;

use super::{EdgeKind, EntityGraph, EntityNode};
use crate::definitions::{EntityId, EntityKind};
use crate::resolver::Resolver;

impl EntityGraph {
    /// Build the graph for everything the resolver can see.
    pub fn build(resolver: &Resolver<'_>) -> Self {
        let mut graph = EntityGraph::default();
        let catalog = resolver.catalog();
        let definitions = resolver.definitions();

        // Phase 1: nodes
        for table in catalog.tables() {
            let table_id = EntityId::new(EntityKind::Table, &table.name);
            let table_node = graph.add_node(table_id, &table.name);
            for column in table.columns() {
                let column_node = graph.add_node(
                    EntityId::column(&table.name, &column.name),
                    &format!("{}.{}", table.name, column.name),
                );
                graph.graph.update_edge(column_node, table_node, EdgeKind::BelongsTo);
            }
        }

        let metrics = graph.add_definitions(
            EntityKind::Metric,
            definitions.metrics.iter().map(|m| m.name.as_str()),
        );
        let relationships = graph.add_definitions(
            EntityKind::Relationship,
            definitions.relationships.iter().map(|r| r.name.as_str()),
        );
        let filters = graph.add_definitions(
            EntityKind::Filter,
            definitions.filters.iter().map(|f| f.name.as_str()),
        );
        graph.add_definitions(
            EntityKind::CustomInstruction,
            definitions.custom_instructions.iter().map(|c| c.name.as_str()),
        );
        let queries = graph.add_definitions(
            EntityKind::VerifiedQuery,
            definitions.verified_queries.iter().map(|q| q.name.as_str()),
        );
        let views = graph.add_definitions(
            EntityKind::SemanticView,
            definitions.views.iter().map(|v| v.name.as_str()),
        );

        // Phase 2: reference edges
        let mut metric_tables = Vec::new();
        for (i, owner) in &metrics {
            let metric = &definitions.metrics[*i];
            let tables = graph.link_tables(resolver, owner, &metric.tables);
            graph.link_text(resolver, owner, &metric.expr);
            metric_tables.push((owner.clone(), tables));
        }

        let mut relationship_tables = Vec::new();
        for (i, owner) in &relationships {
            let relationship = &definitions.relationships[*i];
            let tables = graph.link_tables(
                resolver,
                owner,
                &[relationship.left_table.clone(), relationship.right_table.clone()],
            );
            for condition in &relationship.conditions {
                graph.link_text(resolver, owner, condition);
            }
            relationship_tables.push((owner.clone(), tables));
        }

        let mut filter_tables = Vec::new();
        for (i, owner) in &filters {
            let filter = &definitions.filters[*i];
            let tables = graph.link_tables(resolver, owner, &filter.tables);
            graph.link_text(resolver, owner, &filter.expr);
            filter_tables.push((owner.clone(), tables));
        }

        let mut query_tables = Vec::new();
        for (i, owner) in &queries {
            let query = &definitions.verified_queries[*i];
            let tables = graph.link_tables(resolver, owner, &query.tables);
            query_tables.push((owner.clone(), tables));
        }

        let mut view_tables = Vec::new();
        for (i, owner) in &views {
            let view = &definitions.views[*i];
            let tables = graph.link_tables(resolver, owner, &view.tables);
            for entry in &view.custom_instructions {
                if let Ok(instruction) = resolver.resolve_instruction_entry(entry) {
                    let target = EntityId::new(EntityKind::CustomInstruction, &instruction.name);
                    graph.add_edge(owner, &target, EdgeKind::References);
                }
            }
            view_tables.push((owner.clone(), tables));
        }

        // Phase 3: membership
        for (view, tables) in &view_tables {
            for members in [&relationship_tables, &metric_tables, &filter_tables, &query_tables] {
                for (member, member_tables) in members {
                    if !member_tables.is_empty() && member_tables.is_subset(tables) {
                        graph.add_edge(view, member, EdgeKind::Member);
                    }
                }
            }
        }

        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "entity graph built"
        );
        graph
    }

    fn add_node(&mut self, id: EntityId, name: &str) -> NodeIndex {
        if let Some(&existing) = self.index.get(&id) {
            return existing;
        }
        let index = self.graph.add_node(EntityNode {
            id: id.clone(),
            name: name.to_string(),
        });
        self.index.insert(id, index);
        index
    }

    /// Add nodes for named definitions; returns `(definition index, id)` for
    /// each definition that owns its node.
    fn add_definitions<'n>(
        &mut self,
        kind: EntityKind,
        names: impl Iterator<Item = &'n str>,
    ) -> Vec<(usize, EntityId)> {
        let mut owners = Vec::new();
        for (i, name) in names.enumerate() {
            if name.trim().is_empty() {
                continue;
            }
            let id = EntityId::new(kind, name);
            if self.index.contains_key(&id) {
                continue;
            }
            self.add_node(id.clone(), name.trim());
            owners.push((i, id));
        }
        owners
    }

    fn add_edge(&mut self, from: &EntityId, to: &EntityId, kind: EdgeKind) {
        if let (Some(&a), Some(&b)) = (self.index.get(from), self.index.get(to)) {
            if a != b || kind == EdgeKind::References {
                self.graph.update_edge(a, b, kind);
            }
        }
    }

    /// Link a table list and return the resolved table ids.
    fn link_tables(
        &mut self,
        resolver: &Resolver<'_>,
        owner: &EntityId,
        entries: &[String],
    ) -> BTreeSet<EntityId> {
        let mut tables = BTreeSet::new();
        for table in resolver.resolve_tables(entries) {
            let id = EntityId::new(EntityKind::Table, &table.name);
            self.add_edge(owner, &id, EdgeKind::References);
            tables.insert(id);
        }
        tables
    }

    fn link_text(&mut self, resolver: &Resolver<'_>, owner: &EntityId, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        let resolution = resolver.resolve(owner, text);
        for target in resolution.targets() {
            self.add_edge(owner, &target.entity_id(), EdgeKind::References);
        }
    }
}
