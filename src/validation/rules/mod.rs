//! The rule set. Order here only affects log output; the report is sorted.

mod completeness;
mod cycles;
mod duplicates;
mod identifiers;
mod identity;
mod joins;
mod locations;
mod privacy;
mod references;
mod sources;
mod structure;
mod types;
mod views;

use super::{Finding, ModelContext};
use crate::definitions::EntityKind;

/// A named, independent check.
pub struct Rule {
    pub name: &'static str,
    pub check: fn(&ModelContext<'_>) -> Vec<Finding>,
}

pub const RULES: &[Rule] = &[
    Rule {
        name: sources::RULE,
        check: sources::check,
    },
    Rule {
        name: identity::RULE,
        check: identity::check,
    },
    Rule {
        name: duplicates::RULE,
        check: duplicates::check,
    },
    Rule {
        name: identifiers::RULE,
        check: identifiers::check,
    },
    Rule {
        name: structure::RULE,
        check: structure::check,
    },
    Rule {
        name: references::RULE,
        check: references::check,
    },
    Rule {
        name: cycles::RULE,
        check: cycles::check,
    },
    Rule {
        name: joins::RULE,
        check: joins::check,
    },
    Rule {
        name: types::RULE,
        check: types::check,
    },
    Rule {
        name: privacy::RULE,
        check: privacy::check,
    },
    Rule {
        name: locations::RULE,
        check: locations::check,
    },
    Rule {
        name: completeness::RULE,
        check: completeness::check,
    },
    Rule {
        name: views::RULE,
        check: views::check,
    },
];

/// Name to report for a definition; unnamed entries get a positional label.
pub(crate) fn display_name(name: &str, kind: EntityKind, index: usize) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        format!("<unnamed {} #{}>", kind, index + 1)
    } else {
        trimmed.to_string()
    }
}

/// `(kind, display name, source)` for every definition, in source order.
pub(crate) fn all_definitions<'a>(ctx: &ModelContext<'a>) -> Vec<(EntityKind, String, &'a str)> {
    let defs = ctx.definitions;
    let mut out = Vec::with_capacity(defs.len());
    for (i, m) in defs.metrics.iter().enumerate() {
        out.push((
            EntityKind::Metric,
            display_name(&m.name, EntityKind::Metric, i),
            m.source.as_str(),
        ));
    }
    for (i, r) in defs.relationships.iter().enumerate() {
        out.push((
            EntityKind::Relationship,
            display_name(&r.name, EntityKind::Relationship, i),
            r.source.as_str(),
        ));
    }
    for (i, f) in defs.filters.iter().enumerate() {
        out.push((
            EntityKind::Filter,
            display_name(&f.name, EntityKind::Filter, i),
            f.source.as_str(),
        ));
    }
    for (i, c) in defs.custom_instructions.iter().enumerate() {
        out.push((
            EntityKind::CustomInstruction,
            display_name(&c.name, EntityKind::CustomInstruction, i),
            c.source.as_str(),
        ));
    }
    for (i, q) in defs.verified_queries.iter().enumerate() {
        out.push((
            EntityKind::VerifiedQuery,
            display_name(&q.name, EntityKind::VerifiedQuery, i),
            q.source.as_str(),
        ));
    }
    for (i, v) in defs.views.iter().enumerate() {
        out.push((
            EntityKind::SemanticView,
            display_name(&v.name, EntityKind::SemanticView, i),
            v.source.as_str(),
        ));
    }
    out
}
