//! Every table needs a physical location before it can be emitted.

use crate::definitions::EntityKind;
use crate::validation::{Finding, ModelContext};

pub(super) const RULE: &str = "locations";

pub(super) fn check(ctx: &ModelContext<'_>) -> Vec<Finding> {
    ctx.catalog
        .tables()
        .filter(|table| table.location.is_none())
        .map(|table| {
            Finding::error(
                RULE,
                EntityKind::Table,
                &table.name,
                "table is not in the manifest or is missing its database or schema",
            )
        })
        .collect()
}
