//! Entity Graph: every table, column and definition plus who references whom.
//!
//! Edges point from the referencing entity to the referenced one:
//!
//! ```text
//!   view ──Member──▶ relationship ──References──▶ table ◀──BelongsTo── column
//!     │                                              ▲                    ▲
//!     └──Member──▶ metric ──References───────────────┴────────────────────┘
//!                    │
//!                    └──References──▶ metric
//! ```
//!
//! Forward traversal answers "what does this need"; reverse traversal
//! (`Direction::Incoming`) answers "what is affected if this changes".

mod builder;

use std::collections::{BTreeSet, HashMap, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::definitions::{EntityId, EntityKind};

/// A node: identity plus display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityNode {
    pub id: EntityId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// The source's text or table list names the target.
    References,
    /// Column to its table.
    BelongsTo,
    /// A view includes the target because all of the target's tables are in
    /// the view.
    Member,
}

#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    graph: DiGraph<EntityNode, EdgeKind>,
    index: HashMap<EntityId, NodeIndex>,
}

impl EntityGraph {
    pub fn node(&self, id: &EntityId) -> Option<&EntityNode> {
        self.index.get(id).map(|&i| &self.graph[i])
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.index.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn has_edge(&self, from: &EntityId, to: &EntityId) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&a), Some(&b)) => self.graph.contains_edge(a, b),
            _ => false,
        }
    }

    /// Entities `id` points at directly, sorted.
    pub fn dependencies(&self, id: &EntityId) -> Vec<&EntityNode> {
        self.neighbors(id, Direction::Outgoing, None)
    }

    /// Entities pointing at `id` directly, sorted.
    pub fn dependents(&self, id: &EntityId) -> Vec<&EntityNode> {
        self.neighbors(id, Direction::Incoming, None)
    }

    /// Direct `Member` targets of a view with the given kind, sorted.
    pub fn members(&self, view: &EntityId, kind: EntityKind) -> Vec<&EntityNode> {
        self.neighbors(view, Direction::Outgoing, Some(EdgeKind::Member))
            .into_iter()
            .filter(|n| n.id.kind == kind)
            .collect()
    }

    fn neighbors(
        &self,
        id: &EntityId,
        direction: Direction,
        edge: Option<EdgeKind>,
    ) -> Vec<&EntityNode> {
        let Some(&start) = self.index.get(id) else {
            return Vec::new();
        };
        let mut nodes: Vec<&EntityNode> = self
            .graph
            .edges_directed(start, direction)
            .filter(|e| edge.map_or(true, |kind| *e.weight() == kind))
            .map(|e| match direction {
                Direction::Outgoing => &self.graph[e.target()],
                Direction::Incoming => &self.graph[e.source()],
            })
            .collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes.dedup_by(|a, b| a.id == b.id);
        nodes
    }

    /// Everything reachable from `id` along forward edges, excluding `id`.
    pub fn closure(&self, id: &EntityId) -> BTreeSet<EntityId> {
        self.traverse([id], Direction::Outgoing)
    }

    /// Everything that transitively references any of `ids`, excluding the
    /// starting points.
    pub fn affected_by<'i>(
        &self,
        ids: impl IntoIterator<Item = &'i EntityId>,
    ) -> BTreeSet<EntityId> {
        self.traverse(ids, Direction::Incoming)
    }

    fn traverse<'i>(
        &self,
        starts: impl IntoIterator<Item = &'i EntityId>,
        direction: Direction,
    ) -> BTreeSet<EntityId> {
        let mut seen = vec![false; self.graph.node_count()];
        let mut queue = VecDeque::new();
        for id in starts {
            if let Some(&start) = self.index.get(id) {
                seen[start.index()] = true;
                queue.push_back(start);
            }
        }

        let mut reached = BTreeSet::new();
        while let Some(node) = queue.pop_front() {
            for next in self.graph.neighbors_directed(node, direction) {
                if !seen[next.index()] {
                    seen[next.index()] = true;
                    reached.insert(self.graph[next].id.clone());
                    queue.push_back(next);
                }
            }
        }
        reached
    }

    /// Metric → metric reference edges, keyed and sorted by metric id.
    pub fn metric_references(&self) -> Vec<(&EntityNode, Vec<&EntityNode>)> {
        let mut metrics: Vec<&EntityNode> = self
            .graph
            .node_weights()
            .filter(|n| n.id.kind == EntityKind::Metric)
            .collect();
        metrics.sort_by(|a, b| a.id.cmp(&b.id));

        metrics
            .into_iter()
            .map(|metric| {
                let targets = self
                    .neighbors(&metric.id, Direction::Outgoing, Some(EdgeKind::References))
                    .into_iter()
                    .filter(|n| n.id.kind == EntityKind::Metric)
                    .collect();
                (metric, targets)
            })
            .collect()
    }
}
