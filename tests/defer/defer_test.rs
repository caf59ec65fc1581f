#[path = "../common/mod.rs"]
mod common;

use common::{
    manifest, shop, shop_manifest, Sources, TableSpec, CUSTOMER_COLUMNS, SHOP_DEFINITIONS,
    SHOP_METADATA,
};
use semview::defer::{apply_location_override, diff, impacted_views, CatalogSnapshot};
use semview::graph::EntityGraph;
use semview::resolver::{Resolver, SuggestionConfig};

/// Views impacted going from `reference` to `current`.
fn impacted_between(current: &Sources, reference: &Sources) -> Vec<String> {
    let changes = diff(
        &CatalogSnapshot::from_manifest(&current.manifest).unwrap(),
        &CatalogSnapshot::from_manifest(&reference.manifest).unwrap(),
    );

    let catalog = current.catalog();
    let definitions = current.definitions();
    let resolver = Resolver::new(&catalog, &definitions, SuggestionConfig::default());
    let graph = EntityGraph::build(&resolver);

    let baseline_catalog = reference.catalog();
    let baseline_resolver =
        Resolver::new(&baseline_catalog, &definitions, SuggestionConfig::default());
    let baseline = EntityGraph::build(&baseline_resolver);

    impacted_views(&changes, &graph, &baseline)
        .into_iter()
        .collect()
}

fn impacted(sources: &Sources, reference_orders_checksum: &str) -> Vec<String> {
    let reference = Sources {
        manifest: shop_manifest(reference_orders_checksum),
        ..sources.clone()
    };
    impacted_between(sources, &reference)
}

#[test]
fn test_modified_table_impacts_dependent_view() {
    let current = CatalogSnapshot::from_manifest(&shop_manifest("orders-v2")).unwrap();
    let reference = CatalogSnapshot::from_manifest(&shop_manifest("orders-v1")).unwrap();
    let changes = diff(&current, &reference);

    assert_eq!(changes.modified, vec!["orders"]);
    assert_eq!(changes.unchanged, vec!["customers"]);
    assert!(changes.added.is_empty() && changes.removed.is_empty());
    assert_eq!(changes.summary(), "1 modified, 1 unchanged");

    let mut sources = shop();
    sources.manifest = shop_manifest("orders-v2");
    assert_eq!(impacted(&sources, "orders-v1"), vec!["shop"]);
}

#[test]
fn test_unchanged_manifest_impacts_nothing() {
    let sources = shop();
    let current = CatalogSnapshot::from_manifest(&sources.manifest).unwrap();
    assert!(diff(&current, &current.clone()).is_empty());
    assert!(impacted(&sources, "orders-v1").is_empty());
}

#[test]
fn test_view_without_the_changed_table_is_not_impacted() {
    let definitions = r#"
semantic_views:
  - name: customer_directory
    description: Customers by region
    tables: [customers]
"#;
    let mut sources = Sources::new(shop_manifest("orders-v2"), SHOP_METADATA, definitions);
    assert!(impacted(&sources, "orders-v1").is_empty());

    sources.definitions.clear();
    assert!(impacted(&sources, "orders-v1").is_empty());
}

#[test]
fn test_metric_dependency_impacts_view() {
    // The view lists only customers, but its metric reads orders.
    let definitions = r#"
snowflake_metrics:
  - name: customer_count
    tables: [customers]
    expr: "COUNT({{ column('customers', 'customer_id') }})"
  - name: orders_per_customer
    tables: [customers]
    expr: "{{ metric('customer_count') }} + COUNT({{ column('orders', 'order_id') }})"
semantic_views:
  - name: customer_directory
    description: Customers by region
    tables: [customers]
"#;
    let sources = Sources::new(shop_manifest("orders-v2"), SHOP_METADATA, definitions);
    assert_eq!(impacted(&sources, "orders-v1"), vec!["customer_directory"]);
}

#[test]
fn test_removed_table_impacts_view_that_used_it() {
    let without_orders = manifest(&[TableSpec {
        name: "customers",
        checksum: "customers-v1",
        columns: CUSTOMER_COLUMNS,
    }]);
    let current = Sources::new(without_orders, "models: []", SHOP_DEFINITIONS);
    let reference = Sources::new(shop_manifest("orders-v1"), "models: []", SHOP_DEFINITIONS);

    assert_eq!(impacted_between(&current, &reference), vec!["shop"]);
}

#[test]
fn test_added_and_removed_tables() {
    let current = CatalogSnapshot::from_manifest(&manifest(&[TableSpec {
        name: "customers",
        checksum: "customers-v1",
        columns: CUSTOMER_COLUMNS,
    }]))
    .unwrap();
    let mut with_returns = manifest(&[
        TableSpec {
            name: "customers",
            checksum: "customers-v1",
            columns: CUSTOMER_COLUMNS,
        },
        TableSpec {
            name: "returns",
            checksum: "r1",
            columns: &[("return_id", "NUMBER")],
        },
    ]);
    with_returns.path = "state/manifest.json".into();
    let reference = CatalogSnapshot::from_manifest(&with_returns).unwrap();

    let changes = diff(&current, &reference);
    assert_eq!(changes.removed, vec!["returns"]);
    assert_eq!(changes.total_changes(), 1);

    let changes = diff(&reference, &current);
    assert_eq!(changes.added, vec!["returns"]);
    assert_eq!(changes.to_string(), "1 added, 1 unchanged");
}

#[test]
fn test_location_override_redirects_every_table() {
    let catalog = shop().catalog();
    let deferred = apply_location_override(&catalog, "analytics_dev");

    for table in deferred.tables() {
        let location = table.location.as_ref().unwrap();
        assert_eq!(location.database, "analytics_dev");
        assert_eq!(location.schema, "marts");
    }
    assert_eq!(
        catalog.lookup("orders").unwrap().location.as_ref().unwrap().database,
        "analytics"
    );
    // Metadata survives the move.
    assert_eq!(deferred.lookup("orders").unwrap().primary_key, vec!["order_id"]);
}
