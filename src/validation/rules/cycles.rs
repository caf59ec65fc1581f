//! Metrics must not reference themselves, directly or through other metrics.

use std::collections::{BTreeSet, HashMap};

use crate::definitions::{EntityId, EntityKind};
use crate::graph::EntityNode;
use crate::validation::{Finding, ModelContext};

pub(super) const RULE: &str = "cycles";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    White,
    Gray,
    Black,
}

struct Search<'g> {
    edges: HashMap<&'g EntityId, Vec<&'g EntityNode>>,
    marks: HashMap<&'g EntityId, Mark>,
    path: Vec<&'g EntityNode>,
    seen: BTreeSet<Vec<EntityId>>,
    cycles: Vec<Vec<&'g EntityNode>>,
}

/// Every distinct metric cycle, each rotated to start at its smallest id.
pub fn metric_cycles(ctx: &ModelContext<'_>) -> Vec<Vec<String>> {
    let references = ctx.graph.metric_references();
    let mut search = Search {
        edges: references
            .iter()
            .map(|&(metric, ref targets)| (&metric.id, targets.clone()))
            .collect(),
        marks: HashMap::new(),
        path: Vec::new(),
        seen: BTreeSet::new(),
        cycles: Vec::new(),
    };

    for &(metric, _) in &references {
        if search.mark(&metric.id) == Mark::White {
            search.visit(metric);
        }
    }

    search
        .cycles
        .into_iter()
        .map(|cycle| cycle.iter().map(|n| n.name.clone()).collect())
        .collect()
}

impl<'g> Search<'g> {
    fn mark(&self, id: &EntityId) -> Mark {
        self.marks.get(id).copied().unwrap_or(Mark::White)
    }

    fn visit(&mut self, node: &'g EntityNode) {
        self.marks.insert(&node.id, Mark::Gray);
        self.path.push(node);

        let targets = self.edges.get(&node.id).cloned().unwrap_or_default();
        for target in targets {
            match self.mark(&target.id) {
                Mark::White => self.visit(target),
                Mark::Gray => {
                    if let Some(start) = self.path.iter().position(|n| n.id == target.id) {
                        self.record(self.path[start..].to_vec());
                    }
                }
                Mark::Black => {}
            }
        }

        self.path.pop();
        self.marks.insert(&node.id, Mark::Black);
    }

    fn record(&mut self, mut cycle: Vec<&'g EntityNode>) {
        let smallest = cycle
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.id.cmp(&b.1.id))
            .map(|(i, _)| i)
            .unwrap_or(0);
        cycle.rotate_left(smallest);
        let ids = cycle.iter().map(|n| n.id.clone()).collect();
        if self.seen.insert(ids) {
            self.cycles.push(cycle);
        }
    }
}

pub(super) fn check(ctx: &ModelContext<'_>) -> Vec<Finding> {
    metric_cycles(ctx)
        .into_iter()
        .map(|cycle| {
            let mut chain = cycle.clone();
            chain.push(cycle[0].clone());
            Finding::error(
                RULE,
                EntityKind::Metric,
                &cycle[0],
                format!("circular metric reference: {}", chain.join(" → ")),
            )
        })
        .collect()
}
