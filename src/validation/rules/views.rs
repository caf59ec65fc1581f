//! Multi-table metrics in a view need a join path between their tables.

use std::collections::HashMap;

use crate::definitions::{EntityId, EntityKind};
use crate::validation::{Finding, ModelContext};

pub(super) const RULE: &str = "views";

/// Union-find over table keys.
#[derive(Default)]
struct Components {
    parent: HashMap<String, String>,
}

impl Components {
    fn find(&mut self, key: &str) -> String {
        let parent = self
            .parent
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string());
        if parent == key {
            return parent;
        }
        let root = self.find(&parent);
        self.parent.insert(key.to_string(), root.clone());
        root
    }

    fn union(&mut self, a: &str, b: &str) {
        let (a, b) = (self.find(a), self.find(b));
        if a != b {
            self.parent.insert(a, b);
        }
    }
}

pub(super) fn check(ctx: &ModelContext<'_>) -> Vec<Finding> {
    let defs = ctx.definitions;
    let mut findings = Vec::new();

    for view in &defs.views {
        if view.name.trim().is_empty() {
            continue;
        }
        let view_id = EntityId::new(EntityKind::SemanticView, &view.name);

        let mut components = Components::default();
        for member in ctx.graph.members(&view_id, EntityKind::Relationship) {
            let Some(relationship) = defs
                .relationships
                .iter()
                .find(|r| EntityId::new(EntityKind::Relationship, &r.name) == member.id)
            else {
                continue;
            };
            if let (Ok(left), Ok(right)) = (
                ctx.resolver.resolve_table_entry(&relationship.left_table),
                ctx.resolver.resolve_table_entry(&relationship.right_table),
            ) {
                components.union(&left.key(), &right.key());
            }
        }

        for member in ctx.graph.members(&view_id, EntityKind::Metric) {
            let Some(metric) = ctx.resolver.metric(&member.name) else {
                continue;
            };
            let tables = ctx.resolver.resolve_tables(&metric.tables);
            if tables.len() < 2 {
                continue;
            }
            let root = components.find(&tables[0].key());
            if let Some(stranded) = tables[1..]
                .iter()
                .find(|t| components.find(&t.key()) != root)
            {
                findings.push(Finding::error(
                    RULE,
                    EntityKind::SemanticView,
                    view.name.trim(),
                    format!(
                        "metric '{}' spans '{}' and '{}', but no relationship in the view connects them",
                        metric.name, tables[0].name, stranded.name
                    ),
                ));
            }
        }
    }

    findings
}
