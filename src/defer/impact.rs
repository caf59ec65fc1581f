//! Views that must be regenerated after a catalog change.

use std::collections::BTreeSet;

use super::snapshot::ChangeSet;
use crate::definitions::{EntityId, EntityKind};
use crate::graph::EntityGraph;

/// Names of every view that transitively depends on a changed table.
///
/// Added and modified tables are looked up in `current`. A removed table no
/// longer has a node there, so removals are looked up in `baseline`, the
/// graph built against the reference catalog.
pub fn impacted_views(
    changes: &ChangeSet,
    current: &EntityGraph,
    baseline: &EntityGraph,
) -> BTreeSet<String> {
    let table = |name: &str| EntityId::new(EntityKind::Table, name);
    let present: Vec<EntityId> = changes
        .added
        .iter()
        .chain(&changes.modified)
        .map(|name| table(name))
        .collect();
    let removed: Vec<EntityId> = changes.removed.iter().map(|name| table(name)).collect();

    let mut views = views_affected(current, &present);
    views.extend(views_affected(baseline, &removed));

    tracing::debug!(
        changed = present.len() + removed.len(),
        impacted = views.len(),
        "impact analysis finished"
    );
    views
}

fn views_affected(graph: &EntityGraph, tables: &[EntityId]) -> BTreeSet<String> {
    graph
        .affected_by(tables)
        .into_iter()
        .filter(|id| id.kind == EntityKind::SemanticView)
        .filter_map(|id| graph.node(&id).map(|n| n.name.clone()))
        .collect()
}
