//! Redirect table locations to another database.

use crate::catalog::{CatalogIndex, CatalogTable};

/// Copy of `catalog` with every table's database replaced by `database`.
/// Schema and table names are kept; tables without a location stay without.
pub fn apply_location_override(catalog: &CatalogIndex, database: &str) -> CatalogIndex {
    catalog.map_tables(|table| {
        let mut moved: CatalogTable = table.clone();
        moved.location = table.location.as_ref().map(|l| l.with_database(database));
        moved
    })
}
