#[path = "../common/mod.rs"]
mod common;

use common::{
    manifest, shop, shop_manifest, Sources, TableSpec, CUSTOMER_COLUMNS, SHOP_DEFINITIONS,
    SHOP_METADATA,
};
use semview::compile::{compile, CompileError, CompileInputs, CompileOptions};
use semview::ddl::SynthesisOptions;
use semview::{CatalogIndex, SourceText};

fn inputs(sources: &Sources) -> CompileInputs {
    CompileInputs::new(sources.manifest.clone())
        .with_metadata(sources.metadata.clone())
        .with_definitions(sources.definitions.clone())
}

#[test]
fn test_compile_shop() {
    let sources = shop();
    let output = compile(&inputs(&sources), &CompileOptions::default()).unwrap();

    assert!(output.report.passed());
    assert_eq!(output.views.len(), 1);
    let view = output.view("SHOP").unwrap();
    assert_eq!(view.name, "shop");
    assert_eq!(
        view.ddl,
        sources.synthesize("shop", &SynthesisOptions::default()).unwrap()
    );
    assert!(output.changes.is_none());
    assert!(output.impacted.is_empty());
}

#[test]
fn test_fingerprint_tracks_definitions() {
    let sources = shop();
    let first = compile(&inputs(&sources), &CompileOptions::default()).unwrap();
    let again = compile(&inputs(&sources), &CompileOptions::default()).unwrap();
    assert_eq!(first.fingerprint, again.fingerprint);

    let changed = Sources::new(
        shop_manifest("orders-v1"),
        SHOP_METADATA,
        &SHOP_DEFINITIONS.replace("Revenue per order", "Average revenue per order"),
    );
    let other = compile(&inputs(&changed), &CompileOptions::default()).unwrap();
    assert_ne!(first.fingerprint, other.fingerprint);
}

#[test]
fn test_failed_validation_generates_nothing() {
    let sources = Sources::new(
        shop_manifest("orders-v1"),
        SHOP_METADATA,
        &SHOP_DEFINITIONS.replace("metric('total_revenue')", "metric('total_revenu')"),
    );
    let output = compile(&inputs(&sources), &CompileOptions::default()).unwrap();

    assert!(!output.report.passed());
    assert!(output.views.is_empty());
    assert!(output
        .report
        .errors()
        .any(|f| f.entity == "average_order_value"));
}

#[test]
fn test_strict_compile_blocks_on_warnings() {
    let sources = Sources::new(
        shop_manifest("orders-v1"),
        SHOP_METADATA,
        &SHOP_DEFINITIONS.replace("    description: Revenue per order\n", ""),
    );
    let lenient = compile(&inputs(&sources), &CompileOptions::default()).unwrap();
    assert_eq!(lenient.views.len(), 1);

    let strict = compile(&inputs(&sources), &CompileOptions::default().with_strict(true)).unwrap();
    assert!(strict.views.is_empty());
}

#[test]
fn test_unknown_requested_view() {
    let options = CompileOptions::default().with_views(vec!["warehouse".into()]);
    let err = compile(&inputs(&shop()), &options).unwrap_err();
    assert!(matches!(err, CompileError::UnknownView(ref name) if name == "warehouse"));
    assert_eq!(err.to_string(), "semantic view not found: warehouse");
}

#[test]
fn test_missing_manifest_aborts() {
    let sources = shop();
    let inputs = CompileInputs {
        manifest: None,
        ..inputs(&sources)
    };
    let err = compile(&inputs, &CompileOptions::default()).unwrap_err();
    assert!(matches!(err, CompileError::Catalog(_)));
}

#[test]
fn test_only_modified_uses_reference_manifest() {
    let two_views = format!(
        "{}  - name: customer_directory\n    description: Customers by region\n    tables: [customers]\n",
        SHOP_DEFINITIONS
    );
    let sources = Sources::new(shop_manifest("orders-v2"), SHOP_METADATA, &two_views);
    let options = CompileOptions::default().with_only_modified(true);

    let all = compile(&inputs(&sources), &options).unwrap();
    assert_eq!(all.views.len(), 2);

    let with_reference = inputs(&sources).with_reference_manifest(shop_manifest("orders-v1"));
    let output = compile(&with_reference, &options).unwrap();
    let changes = output.changes.as_ref().unwrap();
    assert_eq!(changes.modified, vec!["orders"]);
    assert_eq!(output.impacted.iter().collect::<Vec<_>>(), vec!["shop"]);
    let names: Vec<&str> = output.views.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["shop"]);

    let unchanged = inputs(&sources).with_reference_manifest(shop_manifest("orders-v2"));
    let output = compile(&unchanged, &options).unwrap();
    assert!(output.changes.as_ref().unwrap().is_empty());
    assert!(output.views.is_empty());
}

#[test]
fn test_removed_table_is_traced_through_reference_manifest() {
    let without_orders = manifest(&[TableSpec {
        name: "customers",
        checksum: "customers-v1",
        columns: CUSTOMER_COLUMNS,
    }]);
    let sources = Sources::new(without_orders, "models: []", SHOP_DEFINITIONS);
    let inputs = inputs(&sources).with_reference_manifest(shop_manifest("orders-v1"));
    let output = compile(&inputs, &CompileOptions::default()).unwrap();

    let changes = output.changes.as_ref().unwrap();
    assert_eq!(changes.removed, vec!["orders"]);
    assert!(output.impacted.contains("shop"));
}

#[test]
fn test_defer_database_rewrites_table_locations() {
    let options = CompileOptions::default()
        .with_defer_database("analytics_dev")
        .with_synthesis(SynthesisOptions::default().with_target("semantic", "layer"));
    let output = compile(&inputs(&shop()), &options).unwrap();
    let ddl = &output.views[0].ddl;

    assert!(ddl.starts_with("CREATE OR REPLACE SEMANTIC VIEW SEMANTIC.LAYER.SHOP"));
    assert!(ddl.contains("ORDERS AS ANALYTICS_DEV.MARTS.ORDERS"));
    assert!(!ddl.contains("ANALYTICS.MARTS"));
}

#[test]
fn test_requested_views_keep_request_order() {
    let two_views = format!(
        "{}  - name: customer_directory\n    description: Customers by region\n    tables: [customers]\n",
        SHOP_DEFINITIONS
    );
    let sources = Sources::new(shop_manifest("orders-v1"), SHOP_METADATA, &two_views);
    let options =
        CompileOptions::default().with_views(vec!["Customer_Directory".into(), "shop".into()]);
    let output = compile(&inputs(&sources), &options).unwrap();
    let names: Vec<&str> = output.views.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["customer_directory", "shop"]);
}

#[test]
fn test_empty_catalog_is_reported_not_raised() {
    let inputs = CompileInputs::new(SourceText::new("target/manifest.json", r#"{"nodes": {}}"#))
        .with_definitions(shop().definitions);
    let output = compile(&inputs, &CompileOptions::default()).unwrap();
    assert!(!output.report.passed());
    assert!(output.views.is_empty());
    assert!(CatalogIndex::load(inputs.manifest.as_ref(), &[]).unwrap().is_empty());
}
