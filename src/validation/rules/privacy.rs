//! Sample values must not leak identifiers or break template compilation.

use crate::definitions::EntityKind;
use crate::validation::{Finding, ModelContext};

pub(super) const RULE: &str = "privacy";

const TEMPLATE_DELIMITERS: &[&str] = &["{{", "}}", "{%", "%}", "{#", "#}"];

pub(super) fn check(ctx: &ModelContext<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();

    for table in ctx.catalog.tables() {
        for column in table.columns() {
            if column.sample_values.is_empty() {
                continue;
            }
            let entity = format!("{}.{}", table.name, column.name);

            if column.is_direct_identifier() {
                findings.push(Finding::error(
                    RULE,
                    EntityKind::Column,
                    &entity,
                    "column is a direct_identifier; PII columns must not expose sample data",
                ));
            }

            for value in &column.sample_values {
                if TEMPLATE_DELIMITERS.iter().any(|d| value.contains(d)) {
                    findings.push(Finding::error(
                        RULE,
                        EntityKind::Column,
                        &entity,
                        format!(
                            "sample value '{}' contains template delimiters and will break dbt compilation",
                            value
                        ),
                    ));
                }
            }
        }
    }

    findings
}
