//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use serde_json::{json, Map, Value};

use semview::catalog::CatalogIndex;
use semview::ddl::{synthesize, SynthesisError, SynthesisOptions};
use semview::definitions::DefinitionSet;
use semview::graph::EntityGraph;
use semview::resolver::{Resolver, SuggestionConfig};
use semview::validation::{validate, ModelContext, ValidationOptions, ValidationReport};
use semview::SourceText;

/// A manifest table: name, checksum, `(column, data type)` pairs.
pub struct TableSpec<'a> {
    pub name: &'a str,
    pub checksum: &'a str,
    pub columns: &'a [(&'a str, &'a str)],
}

/// Build a manifest with every table in `ANALYTICS.MARTS`.
pub fn manifest(tables: &[TableSpec<'_>]) -> SourceText {
    let mut nodes = Map::new();
    for table in tables {
        let mut columns = Map::new();
        for (name, data_type) in table.columns {
            columns.insert(
                name.to_string(),
                json!({ "name": name, "data_type": data_type }),
            );
        }
        nodes.insert(
            format!("model.shop.{}", table.name),
            json!({
                "resource_type": "model",
                "name": table.name,
                "database": "analytics",
                "schema": "marts",
                "checksum": { "name": "sha256", "checksum": table.checksum },
                "columns": Value::Object(columns),
            }),
        );
    }
    let manifest = json!({ "metadata": { "project_name": "shop" }, "nodes": Value::Object(nodes) });
    SourceText::new("target/manifest.json", manifest.to_string())
}

pub const CUSTOMER_COLUMNS: &[(&str, &str)] = &[("customer_id", "NUMBER"), ("region", "VARCHAR")];

pub const ORDER_COLUMNS: &[(&str, &str)] = &[
    ("order_id", "NUMBER"),
    ("customer_id", "NUMBER"),
    ("ordered_at", "TIMESTAMP_NTZ"),
    ("amount", "NUMBER(38,2)"),
];

/// The customers/orders manifest, with the given checksum for `orders`.
pub fn shop_manifest(orders_checksum: &str) -> SourceText {
    manifest(&[
        TableSpec {
            name: "customers",
            checksum: "customers-v1",
            columns: CUSTOMER_COLUMNS,
        },
        TableSpec {
            name: "orders",
            checksum: orders_checksum,
            columns: ORDER_COLUMNS,
        },
    ])
}

pub const SHOP_METADATA: &str = r#"
models:
  - name: customers
    description: One row per customer
    meta:
      sst:
        primary_key: [customer_id]
        synonyms: [clients]
    columns:
      - name: customer_id
        description: Customer identifier
        meta:
          sst:
            column_type: dimension
      - name: region
        description: Sales region
        meta:
          sst:
            column_type: dimension
            sample_values: [EMEA, APAC]
            is_enum: true
  - name: orders
    description: One row per order
    meta:
      sst:
        primary_key: order_id
        synonyms: [purchases]
    columns:
      - name: order_id
        description: Order identifier
        meta:
          sst:
            column_type: dimension
      - name: customer_id
        description: Ordering customer
        meta:
          sst:
            column_type: dimension
      - name: ordered_at
        description: When the order was placed
        meta:
          sst:
            column_type: time_dimension
      - name: amount
        description: Order total
        meta:
          sst:
            column_type: fact
            synonyms: [order value]
"#;

pub const SHOP_DEFINITIONS: &str = r#"
snowflake_relationships:
  - name: orders_to_customers
    left_table: "{{ table('orders') }}"
    right_table: "{{ table('customers') }}"
    relationship_conditions:
      - "{{ column('orders', 'customer_id') }} = {{ column('customers', 'customer_id') }}"

snowflake_metrics:
  - name: total_revenue
    tables:
      - "{{ table('orders') }}"
    description: Sum of order totals
    expr: "SUM({{ column('orders', 'amount') }})"
    synonyms: [revenue, sales]
  - name: average_order_value
    tables: ["{{ table('orders') }}"]
    description: Revenue per order
    expr: "{{ metric('total_revenue') }} / COUNT({{ column('orders', 'order_id') }})"
    synonyms: [aov]

snowflake_filters:
  - name: emea_only
    tables: ["{{ table('customers') }}"]
    description: Customers in EMEA
    expr: "{{ column('customers', 'region') }} = 'EMEA'"

snowflake_custom_instructions:
  - name: fiscal_calendar
    sql_generation: Fiscal years start on February 1st.
    question_categorization: Reject questions about individual customers.

semantic_views:
  - name: shop
    description: Orders and the customers who placed them
    tables:
      - "{{ table('customers') }}"
      - "{{ table('orders') }}"
    custom_instructions:
      - "{{ custom_instructions('fiscal_calendar') }}"
"#;

/// Everything a compilation reads.
#[derive(Debug, Clone)]
pub struct Sources {
    pub manifest: SourceText,
    pub metadata: Vec<SourceText>,
    pub definitions: Vec<SourceText>,
}

impl Sources {
    pub fn new(manifest: SourceText, metadata: &str, definitions: &str) -> Self {
        Self {
            manifest,
            metadata: vec![SourceText::new("models/schema.yml", metadata)],
            definitions: vec![SourceText::new(
                "snowflake_semantic_models/definitions.yml",
                definitions,
            )],
        }
    }

    pub fn catalog(&self) -> CatalogIndex {
        CatalogIndex::load(Some(&self.manifest), &self.metadata).unwrap()
    }

    pub fn definitions(&self) -> DefinitionSet {
        DefinitionSet::load(&self.definitions)
    }

    /// Run resolution and validation.
    pub fn validate(&self, strict: bool) -> ValidationReport {
        let catalog = self.catalog();
        let definitions = self.definitions();
        let resolver = Resolver::new(&catalog, &definitions, SuggestionConfig::default());
        let graph = EntityGraph::build(&resolver);
        let ctx = ModelContext::new(&resolver, &graph);
        validate(&ctx, &ValidationOptions::default().strict(strict))
    }

    /// Validate, then synthesize one view.
    pub fn synthesize(
        &self,
        view: &str,
        options: &SynthesisOptions,
    ) -> Result<String, SynthesisError> {
        let catalog = self.catalog();
        let definitions = self.definitions();
        let resolver = Resolver::new(&catalog, &definitions, SuggestionConfig::default());
        let graph = EntityGraph::build(&resolver);
        let ctx = ModelContext::new(&resolver, &graph);
        let report = validate(&ctx, &ValidationOptions::default());
        synthesize(view, &ctx, &report, options)
    }
}

/// The customers/orders project.
pub fn shop() -> Sources {
    Sources::new(shop_manifest("orders-v1"), SHOP_METADATA, SHOP_DEFINITIONS)
}

/// Messages of every finding at or above ERROR.
pub fn error_messages(report: &ValidationReport) -> Vec<String> {
    report
        .errors()
        .map(|f| format!("{} {}: {}", f.kind, f.entity, f.message))
        .collect()
}
