//! Column classifications must agree with declared data types.

use crate::catalog::{ColumnKind, TypeFamily};
use crate::definitions::EntityKind;
use crate::validation::{Finding, ModelContext};

pub(super) const RULE: &str = "types";

pub(super) fn check(ctx: &ModelContext<'_>) -> Vec<Finding> {
    let mut findings = Vec::new();

    for table in ctx.catalog.tables() {
        for column in table.columns() {
            let entity = format!("{}.{}", table.name, column.name);
            let Some(raw) = column.column_type.as_deref() else {
                continue;
            };
            let Some(kind) = ColumnKind::parse(raw) else {
                findings.push(Finding::error(
                    RULE,
                    EntityKind::Column,
                    &entity,
                    format!(
                        "invalid column_type '{}'; expected dimension, time_dimension or fact",
                        raw
                    ),
                ));
                continue;
            };

            let family = column.type_family();
            let data_type = column.data_type.as_deref().unwrap_or_default();
            match kind {
                ColumnKind::Fact if !matches!(family, TypeFamily::Numeric | TypeFamily::Unknown) => {
                    findings.push(Finding::error(
                        RULE,
                        EntityKind::Column,
                        &entity,
                        format!("fact columns must be numeric, but data type is '{}'", data_type),
                    ));
                }
                ColumnKind::TimeDimension
                    if !matches!(family, TypeFamily::Temporal | TypeFamily::Unknown) =>
                {
                    findings.push(Finding::error(
                        RULE,
                        EntityKind::Column,
                        &entity,
                        format!(
                            "time_dimension columns must be a date or timestamp, but data type is '{}'",
                            data_type
                        ),
                    ));
                }
                _ => {}
            }

            if column.is_enum && kind != ColumnKind::Dimension {
                findings.push(Finding::error(
                    RULE,
                    EntityKind::Column,
                    &entity,
                    format!("{} columns should never be enums", kind),
                ));
            }
        }
    }

    findings
}
