#[path = "../common/mod.rs"]
mod common;

use common::{shop, shop_manifest, SHOP_METADATA};
use semview::catalog::{CatalogIndex, CatalogLoadError, ColumnKind, PrivacyCategory, TypeFamily};
use semview::SourceText;

#[test]
fn test_load_shop_catalog() {
    let catalog = shop().catalog();

    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.table_names().collect::<Vec<_>>(), vec!["customers", "orders"]);

    let orders = catalog.lookup("ORDERS").unwrap();
    assert_eq!(
        orders.location.as_ref().unwrap().to_string(),
        "analytics.marts.orders"
    );
    assert_eq!(orders.checksum.as_deref(), Some("orders-v1"));
    assert_eq!(orders.primary_key, vec!["order_id"]);
    assert_eq!(orders.synonyms, vec!["purchases"]);
    assert_eq!(orders.metadata_source.as_deref(), Some("models/schema.yml"));
}

#[test]
fn test_columns_carry_manifest_types_and_metadata() {
    let catalog = shop().catalog();

    let names: Vec<&str> = catalog
        .lookup("orders")
        .unwrap()
        .columns()
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["order_id", "customer_id", "ordered_at", "amount"]);

    let amount = catalog.lookup_column("orders", "AMOUNT").unwrap();
    assert_eq!(amount.data_type.as_deref(), Some("NUMBER(38,2)"));
    assert_eq!(amount.type_family(), TypeFamily::Numeric);
    assert_eq!(amount.kind(), Some(ColumnKind::Fact));
    assert_eq!(amount.synonyms, vec!["order value"]);

    let ordered_at = catalog.lookup_column("orders", "ordered_at").unwrap();
    assert_eq!(ordered_at.kind(), Some(ColumnKind::TimeDimension));
    assert_eq!(ordered_at.type_family(), TypeFamily::Temporal);

    let region = catalog.lookup_column("customers", "region").unwrap();
    assert_eq!(region.sample_values, vec!["EMEA", "APAC"]);
    assert!(region.is_enum);
}

#[test]
fn test_missing_manifest_is_fatal() {
    let metadata = [SourceText::new("models/schema.yml", SHOP_METADATA)];
    let err = CatalogIndex::load(None, &metadata).unwrap_err();
    assert!(matches!(err, CatalogLoadError::MissingManifest));
}

#[test]
fn test_malformed_manifest_is_fatal() {
    let broken = SourceText::new("target/manifest.json", "{ not json");
    let err = CatalogIndex::load(Some(&broken), &[]).unwrap_err();
    assert!(matches!(err, CatalogLoadError::ManifestJson { .. }));

    let no_nodes = SourceText::new("target/manifest.json", r#"{"metadata": {}}"#);
    let err = CatalogIndex::load(Some(&no_nodes), &[]).unwrap_err();
    assert!(matches!(err, CatalogLoadError::ManifestShape { .. }));
    assert!(err.to_string().contains("nodes"));
}

#[test]
fn test_malformed_metadata_is_fatal() {
    let manifest = shop_manifest("orders-v1");
    let metadata = [SourceText::new("models/bad.yml", "models: [unclosed")];
    let err = CatalogIndex::load(Some(&manifest), &metadata).unwrap_err();
    match err {
        CatalogLoadError::Metadata { path, .. } => assert_eq!(path, "models/bad.yml"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_non_model_nodes_are_ignored() {
    let manifest = SourceText::new(
        "target/manifest.json",
        r#"{
            "nodes": {
                "model.shop.orders": {
                    "resource_type": "model",
                    "name": "orders",
                    "database": "analytics",
                    "schema": "marts",
                    "alias": "fct_orders",
                    "columns": {}
                },
                "test.shop.unique_orders_order_id": {
                    "resource_type": "test",
                    "name": "unique_orders_order_id",
                    "columns": {}
                }
            }
        }"#,
    );
    let catalog = CatalogIndex::load(Some(&manifest), &[]).unwrap();
    assert_eq!(catalog.len(), 1);
    let orders = catalog.lookup("orders").unwrap();
    assert_eq!(orders.location.as_ref().unwrap().table, "fct_orders");
    assert_eq!(orders.checksum, None);
}

#[test]
fn test_config_meta_and_string_keys() {
    let manifest = shop_manifest("orders-v1");
    let metadata = [SourceText::new(
        "models/customers.yml",
        r#"
models:
  - name: customers
    config:
      meta:
        sst:
          primary_key: "customer_id, region"
          unique_keys: [[customer_id], [region]]
    columns:
      - name: email
        data_type: varchar
        config:
          meta:
            sst:
              column_type: dimension
              privacy_category: direct_identifier
"#,
    )];
    let catalog = CatalogIndex::load(Some(&manifest), &metadata).unwrap();
    let customers = catalog.lookup("customers").unwrap();

    assert_eq!(customers.primary_key, vec!["customer_id", "region"]);
    assert_eq!(
        customers.unique_keys,
        vec![vec!["customer_id".to_string()], vec!["region".to_string()]]
    );

    // Declared columns first, then the rest of the manifest's.
    let names: Vec<&str> = customers.columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["email", "customer_id", "region"]);

    let email = customers.column("EMAIL").unwrap();
    assert_eq!(email.privacy, Some(PrivacyCategory::DirectIdentifier));
    assert_eq!(email.data_type.as_deref(), Some("varchar"));
}

#[test]
fn test_metadata_without_models_key() {
    let manifest = shop_manifest("orders-v1");
    let metadata = [SourceText::new(
        "models/sources.yml",
        "version: 2\nsources:\n  - name: raw\n",
    )];
    let catalog = CatalogIndex::load(Some(&manifest), &metadata).unwrap();
    assert_eq!(catalog.len(), 2);
    assert!(catalog.lookup("orders").unwrap().metadata_source.is_none());
}
