//! Definition files that could not be read.

use crate::definitions::EntityKind;
use crate::validation::{Finding, ModelContext};

pub(super) const RULE: &str = "sources";

pub(super) fn check(ctx: &ModelContext<'_>) -> Vec<Finding> {
    ctx.definitions
        .issues
        .iter()
        .map(|issue| Finding::error(RULE, EntityKind::Source, &issue.path, &issue.message))
        .collect()
}
