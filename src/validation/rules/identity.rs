//! Every definition has a name, unique per kind after case and underscore
//! folding.

use std::collections::HashMap;

use super::all_definitions;
use crate::definitions::EntityKind;
use crate::names::identity_key;
use crate::validation::{Finding, ModelContext};

pub(super) const RULE: &str = "identity";

pub(super) fn check(ctx: &ModelContext<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut seen: HashMap<(EntityKind, String), (String, &str)> = HashMap::new();

    for (kind, name, source) in all_definitions(ctx) {
        if name.starts_with("<unnamed ") {
            findings.push(Finding::error(
                RULE,
                kind,
                &name,
                format!("{} is missing required field 'name' (in {})", kind, source),
            ));
            continue;
        }

        let key = (kind, identity_key(&name));
        match seen.get(&key) {
            Some((first, first_source)) => findings.push(Finding::error(
                RULE,
                kind,
                &name,
                format!(
                    "duplicate {} name: '{}' ({}) collides with '{}' ({})",
                    kind, name, source, first, first_source
                ),
            )),
            None => {
                seen.insert(key, (name, source));
            }
        }
    }

    findings
}
