#[path = "../common/mod.rs"]
mod common;

use common::{
    error_messages, manifest, shop, shop_manifest, Sources, TableSpec, ORDER_COLUMNS,
    SHOP_DEFINITIONS, SHOP_METADATA,
};
use semview::definitions::{EntityId, EntityKind};
use semview::{Severity, SourceText};

// ============================================================================
// Whole-report properties
// ============================================================================

#[test]
fn test_shop_has_no_findings_above_warning() {
    let report = shop().validate(false);
    assert_eq!(report.errors().count(), 0, "{:#?}", error_messages(&report));
    assert!(report.passed());
    assert!(report.invalid_entities().is_empty());
}

#[test]
fn test_validation_is_idempotent() {
    let sources = Sources::new(
        shop_manifest("orders-v1"),
        SHOP_METADATA,
        r#"
snowflake_metrics:
  - name: Total Revenue!
    tables: [ordrs]
    expr: "SUM({{ column('orders', 'amout') }}"
  - name: total_revenue
    tables: [orders]
    expr: "{{ metric('total_revenue') }}"
semantic_views:
  - name: shop
    tables: [orders, customer]
"#,
    );
    let first = sources.validate(false);
    let second = sources.validate(false);
    assert!(!first.findings().is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_findings_are_ordered_by_kind_then_name() {
    let sources = Sources::new(
        shop_manifest("orders-v1"),
        SHOP_METADATA,
        r#"
semantic_views:
  - name: zeta
    tables: [nope]
snowflake_metrics:
  - name: beta
    tables: [orders]
    expr: "{{ metric('missing') }}"
  - name: Alpha
    tables: [orders]
    expr: "{{ metric('missing') }}"
"#,
    );
    let report = sources.validate(false);
    let keys: Vec<(EntityKind, String)> = report
        .errors()
        .map(|f| (f.kind, f.entity.to_lowercase()))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_eq!(keys.first().map(|k| k.1.as_str()), Some("alpha"));
    assert_eq!(keys.last().map(|k| k.0), Some(EntityKind::SemanticView));
}

#[test]
fn test_all_errors_are_reported_in_one_run() {
    let broken = SourceText::new("snowflake_semantic_models/broken.yml", "snowflake_metrics: [");
    let mut sources = shop();
    sources.definitions.insert(0, broken);
    sources.definitions.push(SourceText::new(
        "snowflake_semantic_models/more.yml",
        r#"
snowflake_filters:
  - name: bad_filter
    tables: [orders]
    expr: "{{ column('orders', 'amont') }} > 0"
snowflake_verified_queries:
  - name: q1
    question: How much did we sell?
    sql: SELECT 1
    tables: [sales]
    verified_at: yesterday
"#,
    ));

    let report = sources.validate(false);
    let errors = error_messages(&report);

    assert!(errors.iter().any(|e| e.starts_with("source snowflake_semantic_models/broken.yml")));
    assert!(errors.iter().any(|e| e.contains("bad_filter") && e.contains("'amont'")));
    // The rest of the files still loaded.
    assert_eq!(sources.definitions().metrics.len(), 2);

    let q1: Vec<_> = report
        .findings()
        .iter()
        .filter(|f| f.kind == EntityKind::VerifiedQuery)
        .collect();
    assert!(q1.iter().all(|f| f.severity == Severity::Warning));
    assert!(q1.iter().any(|f| f.message.contains("'sales'")));
    assert!(q1.iter().any(|f| f.message.contains("verified_at")));
}

#[test]
fn test_empty_catalog_short_circuits() {
    let sources = Sources::new(
        SourceText::new("target/manifest.json", r#"{"nodes": {}}"#),
        "",
        SHOP_DEFINITIONS,
    );
    let report = sources.validate(false);
    assert_eq!(report.findings().len(), 1);
    assert_eq!(report.findings()[0].severity, Severity::Required);
    assert!(!report.passed());
}

#[test]
fn test_strict_mode_blocks_on_warnings() {
    let sources = Sources::new(
        shop_manifest("orders-v1"),
        SHOP_METADATA,
        &SHOP_DEFINITIONS.replace("    description: Sum of order totals\n", ""),
    );
    let lenient = sources.validate(false);
    assert!(lenient.passed());
    assert!(lenient.count(Severity::Warning) > 0);

    let strict = sources.validate(true);
    assert!(!strict.passed());
    assert!(strict.is_blocked(&EntityId::new(EntityKind::Metric, "total_revenue")));
}

// ============================================================================
// Metric cycles
// ============================================================================

fn cycle_sources(c_expr: &str) -> Sources {
    let definitions = format!(
        r#"
snowflake_metrics:
  - name: a
    tables: [orders]
    expr: "{{{{ metric('b') }}}} + 1"
  - name: b
    tables: [orders]
    expr: "{{{{ metric('c') }}}} * 2"
  - name: c
    tables: [orders]
    expr: "{}"
"#,
        c_expr
    );
    Sources::new(shop_manifest("orders-v1"), SHOP_METADATA, &definitions)
}

#[test]
fn test_three_metric_cycle_is_reported_once() {
    let report = cycle_sources("{{ metric('a') }} - 3").validate(false);

    let cycles: Vec<_> = report
        .findings()
        .iter()
        .filter(|f| f.message.starts_with("circular metric reference"))
        .collect();
    assert_eq!(cycles.len(), 1, "{:#?}", report.findings());
    assert_eq!(cycles[0].severity, Severity::Error);
    assert_eq!(cycles[0].entity, "a");
    assert_eq!(cycles[0].message, "circular metric reference: a → b → c → a");
}

#[test]
fn test_breaking_the_cycle_clears_it() {
    let report = cycle_sources("SUM({{ column('orders', 'amount') }})").validate(false);
    assert!(report
        .findings()
        .iter()
        .all(|f| !f.message.starts_with("circular metric reference")));
    assert!(report.passed(), "{:#?}", error_messages(&report));
}

#[test]
fn test_self_reference_is_a_cycle() {
    let report = cycle_sources("{{ metric('c') }} + 1").validate(false);
    let cycles: Vec<_> = report
        .findings()
        .iter()
        .filter(|f| f.message.starts_with("circular metric reference"))
        .collect();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].message, "circular metric reference: c → c");
}

// ============================================================================
// Joins
// ============================================================================

const TIER_COLUMNS: &[(&str, &str)] = &[
    ("customer_id", "NUMBER"),
    ("effective_at", "TIMESTAMP_NTZ"),
    ("tier", "VARCHAR"),
];

const TIER_METADATA: &str = r#"
models:
  - name: customer_tiers
    description: Loyalty tier history
    meta:
      sst:
        synonyms: [tiers]
        UNIQUE_KEYS_LINE
"#;

const TIER_DEFINITIONS: &str = r#"
snowflake_relationships:
  - name: orders_to_tiers
    left_table: orders
    right_table: customer_tiers
    relationship_conditions:
      - "{{ column('orders', 'customer_id') }} = {{ column('customer_tiers', 'customer_id') }}"
      - "{{ column('orders', 'ordered_at') }} >= {{ column('customer_tiers', 'effective_at') }}"
"#;

fn tier_sources(unique_keys: &str) -> Sources {
    let manifest = manifest(&[
        TableSpec {
            name: "orders",
            checksum: "o1",
            columns: ORDER_COLUMNS,
        },
        TableSpec {
            name: "customer_tiers",
            checksum: "t1",
            columns: TIER_COLUMNS,
        },
    ]);
    Sources::new(
        manifest,
        &TIER_METADATA.replace("UNIQUE_KEYS_LINE", unique_keys),
        TIER_DEFINITIONS,
    )
}

#[test]
fn test_asof_join_requires_unique_witness() {
    let report = tier_sources("").validate(false);

    let errors: Vec<_> = report.errors().collect();
    assert_eq!(errors.len(), 1, "{:#?}", error_messages(&report));
    assert_eq!(errors[0].kind, EntityKind::Relationship);
    assert_eq!(errors[0].entity, "orders_to_tiers");
    assert!(errors[0].message.contains("primary key or unique key"));
}

#[test]
fn test_unique_key_clears_asof_error() {
    let report = tier_sources("unique_keys: [customer_id, effective_at]").validate(false);
    assert_eq!(report.errors().count(), 0, "{:#?}", error_messages(&report));

    let report = tier_sources("primary_key: [effective_at, customer_id]").validate(false);
    assert_eq!(report.errors().count(), 0, "{:#?}", error_messages(&report));
}

#[test]
fn test_equality_join_without_witness_is_a_warning() {
    let sources = Sources::new(
        shop_manifest("orders-v1"),
        SHOP_METADATA,
        r#"
snowflake_relationships:
  - name: customers_to_orders
    left_table: customers
    right_table: orders
    relationship_conditions:
      - "{{ column('customers', 'customer_id') }} = {{ column('orders', 'customer_id') }}"
"#,
    );
    let report = sources.validate(false);
    assert!(report.passed());
    assert!(report.warnings().any(|f| f.entity == "customers_to_orders"
        && f.message.contains("may duplicate rows")));
}

#[test]
fn test_unsupported_operator_and_transformed_column() {
    let sources = Sources::new(
        shop_manifest("orders-v1"),
        SHOP_METADATA,
        r#"
snowflake_relationships:
  - name: orders_to_customers
    left_table: orders
    right_table: customers
    relationship_conditions:
      - "{{ column('orders', 'customer_id') }} <= {{ column('customers', 'customer_id') }}"
      - "{{ column('orders', 'customer_id') }}::varchar = {{ column('customers', 'customer_id') }}"
"#,
    );
    let report = sources.validate(false);
    let errors = error_messages(&report);
    assert!(errors.iter().any(|e| e.contains("only = and >= joins are allowed")));
    assert!(report
        .errors()
        .filter(|f| f.entity == "orders_to_customers")
        .count()
        >= 2);
}

// ============================================================================
// Catalog rules
// ============================================================================

fn privacy_sources(column_sst: &str) -> Sources {
    let metadata = format!(
        r#"
models:
  - name: customers
    description: One row per customer
    meta:
      sst:
        primary_key: [customer_id]
        synonyms: [clients]
    columns:
      - name: email
        description: Contact address
        meta:
          sst:
            privacy_category: direct_identifier
            sample_values: [a@example.com, b@example.com]
{}
"#,
        column_sst
    );
    Sources::new(shop_manifest("orders-v1"), &metadata, "")
}

#[test]
fn test_direct_identifier_with_samples_always_fails() {
    let variants = [
        "",
        "            column_type: dimension",
        "            column_type: dimension\n            is_enum: true",
        "            column_type: dimension\n            synonyms: [mail]\n            data_type: varchar",
    ];
    for variant in variants {
        let report = privacy_sources(variant).validate(false);
        assert!(!report.passed(), "variant {:?}", variant);
        assert!(
            report.errors().any(|f| f.kind == EntityKind::Column
                && f.entity == "customers.email"
                && f.message.contains("PII")),
            "variant {:?}: {:#?}",
            variant,
            error_messages(&report)
        );
    }
}

#[test]
fn test_type_and_classification_rules() {
    let metadata = r#"
models:
  - name: orders
    description: One row per order
    meta:
      sst:
        primary_key: [order_id]
        synonyms: [purchases]
    columns:
      - name: ordered_at
        description: When
        meta:
          sst:
            column_type: fact
      - name: amount
        description: Total
        meta:
          sst:
            column_type: time_dimension
            is_enum: true
      - name: order_id
        description: Id
        meta:
          sst:
            column_type: identifier
            sample_values: ["{{ oops }}"]
"#;
    let report = Sources::new(shop_manifest("orders-v1"), metadata, "").validate(false);
    let errors = error_messages(&report);

    assert!(errors.iter().any(|e| e.contains("orders.ordered_at") && e.contains("must be numeric")));
    assert!(errors.iter().any(|e| e.contains("orders.amount") && e.contains("date or timestamp")));
    assert!(errors.iter().any(|e| e.contains("orders.amount") && e.contains("never be enums")));
    assert!(errors.iter().any(|e| e.contains("orders.order_id") && e.contains("invalid column_type")));
    assert!(errors.iter().any(|e| e.contains("orders.order_id") && e.contains("dbt compilation")));
}

#[test]
fn test_metadata_only_table_has_no_location() {
    let metadata = format!(
        "{}\n  - name: returns\n    description: Returned orders\n    meta:\n      sst:\n        synonyms: [refunds]\n        primary_key: [return_id]\n",
        SHOP_METADATA.trim_end()
    );
    let report = Sources::new(shop_manifest("orders-v1"), &metadata, "").validate(false);
    assert!(report
        .errors()
        .any(|f| f.kind == EntityKind::Table && f.entity == "returns"));
}

// ============================================================================
// Definition rules
// ============================================================================

#[test]
fn test_names_duplicates_and_structure() {
    let definitions = r#"
snowflake_metrics:
  - name: total revenue
    tables: [orders]
    expr: "SUM({{ column('orders', 'amount') }})"
  - name: Gross_Sales
    tables: [orders]
    expr: "SUM({{ column('orders', 'amount') }}"
  - name: grosssales
    tables: [orders]
    expr: COUNT(*)
  - name: order_count
    tables: [orders]
    expr: count(*)
  - tables: [orders]
    expr: SUM(1)
snowflake_custom_instructions:
  - name: terse
    sql_generation: Be brief
  - name: empty
"#;
    let report = Sources::new(shop_manifest("orders-v1"), SHOP_METADATA, definitions).validate(false);
    let errors = error_messages(&report);

    let invalid = report
        .errors()
        .find(|f| f.entity == "total revenue" && f.message.contains("invalid characters"))
        .unwrap();
    assert_eq!(invalid.suggestions, vec!["total_revenue"]);

    assert!(errors.iter().any(|e| e.contains("duplicate metric name")));
    assert!(errors.iter().any(|e| e.contains("Gross_Sales") && e.contains("unclosed '('")));
    assert!(errors.iter().any(|e| e.contains("missing required field 'name'")));
    assert!(errors.iter().any(|e| e.contains("custom instruction empty")));
    assert!(report
        .warnings()
        .any(|f| f.entity == "terse" && f.kind == EntityKind::CustomInstruction));
    assert!(report
        .warnings()
        .any(|f| f.message.contains("has the same expression as metric")));
}

#[test]
fn test_metric_spanning_unconnected_tables() {
    let definitions = r#"
snowflake_metrics:
  - name: revenue_per_customer
    tables: [orders, customers]
    expr: "SUM({{ column('orders', 'amount') }}) / COUNT({{ column('customers', 'customer_id') }})"
semantic_views:
  - name: shop
    description: Shop
    tables: [orders, customers]
"#;
    let report = Sources::new(shop_manifest("orders-v1"), SHOP_METADATA, definitions).validate(false);
    assert!(report.errors().any(|f| f.kind == EntityKind::SemanticView
        && f.entity == "shop"
        && f.message.contains("no relationship in the view connects them")));

    let connected = format!(
        "{}\nsnowflake_relationships:\n  - name: orders_to_customers\n    left_table: orders\n    right_table: customers\n    relationship_conditions:\n      - \"{{{{ column('orders', 'customer_id') }}}} = {{{{ column('customers', 'customer_id') }}}}\"\n",
        definitions
    );
    let report = Sources::new(shop_manifest("orders-v1"), SHOP_METADATA, &connected).validate(false);
    assert!(report.passed(), "{:#?}", error_messages(&report));
}

#[test]
fn test_view_with_unknown_instruction_and_duplicate_synonyms() {
    let metadata = SHOP_METADATA.replace("synonyms: [purchases]", "synonyms: [clients]");
    let definitions = r#"
semantic_views:
  - name: shop
    description: Shop
    tables: [orders, customers]
    custom_instructions: [fiscal]
"#;
    let report = Sources::new(shop_manifest("orders-v1"), &metadata, definitions).validate(false);
    let view_errors: Vec<_> = report
        .errors()
        .filter(|f| f.kind == EntityKind::SemanticView && f.entity == "shop")
        .collect();
    assert!(view_errors
        .iter()
        .any(|f| f.message.contains("custom instruction 'fiscal' not found")));
    assert!(view_errors.iter().any(|f| f.message.contains("clients")));
}

#[test]
fn test_summary_counts_invalid_entities() {
    let definitions = r#"
snowflake_metrics:
  - name: one
    tables: [nope]
    expr: COUNT(*)
  - name: two
    tables: [orders]
    expr: "{{ metric('zero') }}"
"#;
    let report = Sources::new(shop_manifest("orders-v1"), SHOP_METADATA, definitions).validate(false);
    let invalid = report.invalid_entities().len();
    assert_eq!(invalid, 2);
    assert!(report.summary().starts_with("2 of "));
}
