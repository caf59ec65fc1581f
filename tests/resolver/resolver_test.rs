#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use common::{manifest, shop, Sources, TableSpec, ORDER_COLUMNS, SHOP_DEFINITIONS};
use semview::definitions::{EntityId, EntityKind};
use semview::resolver::{suggest, EntryError, Resolver, SuggestionConfig, Target, UnresolvedReason};
use semview::Severity;

fn orders_only() -> Sources {
    let manifest = manifest(&[TableSpec {
        name: "orders",
        checksum: "v1",
        columns: ORDER_COLUMNS,
    }]);
    Sources::new(
        manifest,
        "",
        r#"
snowflake_metrics:
  - name: order_count
    tables: ["{{ table('order') }}"]
    expr: "COUNT({{ column('order', 'order_id') }})"
"#,
    )
}

#[test]
fn test_misspelled_table_suggests_closest() {
    let sources = orders_only();
    let catalog = sources.catalog();
    let definitions = sources.definitions();
    let resolver = Resolver::new(&catalog, &definitions, SuggestionConfig::default());

    let owner = EntityId::new(EntityKind::Metric, "order_count");
    let resolution = resolver.resolve(&owner, "{{ table('order') }}");
    assert_eq!(resolution.unresolved.len(), 1);
    let unresolved = &resolution.unresolved[0];
    assert_eq!(unresolved.reason, UnresolvedReason::UnknownTable);
    assert_eq!(unresolved.suggestions, vec!["orders"]);
    assert_eq!(
        unresolved.to_string(),
        "table 'order' not found; did you mean 'orders'?"
    );
}

#[test]
fn test_unresolved_reference_is_an_error_finding_with_suggestion() {
    let report = orders_only().validate(false);

    let findings: Vec<_> = report
        .findings()
        .iter()
        .filter(|f| f.rule == "references")
        .collect();
    assert!(!findings.is_empty());
    for finding in &findings {
        assert_eq!(finding.severity, Severity::Error);
        assert_eq!(finding.kind, EntityKind::Metric);
        assert_eq!(finding.entity, "order_count");
        assert!(finding.suggestions.contains(&"orders".to_string()));
    }
    assert!(!report.passed());
}

#[test]
fn test_ref_forms_resolve_like_table_and_column() {
    let sources = shop();
    let catalog = sources.catalog();
    let definitions = sources.definitions();
    let resolver = Resolver::new(&catalog, &definitions, SuggestionConfig::default());
    let owner = EntityId::new(EntityKind::Filter, "f");

    let resolution = resolver.resolve(&owner, "{{ ref('ORDERS') }} / {{ ref(\"orders\", \"Amount\") }}");
    assert!(resolution.is_clean());
    let targets: Vec<&Target> = resolution.targets().collect();
    assert_eq!(
        targets,
        vec![
            &Target::Table {
                table: "orders".into()
            },
            &Target::Column {
                table: "orders".into(),
                column: "amount".into()
            },
        ]
    );
}

#[test]
fn test_metric_and_instruction_targets() {
    let sources = shop();
    let catalog = sources.catalog();
    let definitions = sources.definitions();
    let resolver = Resolver::new(&catalog, &definitions, SuggestionConfig::default());
    let owner = EntityId::new(EntityKind::Metric, "x");

    let resolution = resolver.resolve(&owner, "{{ metric('Total_Revenue') }} * 2");
    assert!(matches!(
        resolution.targets().next(),
        Some(Target::Metric { name, index: 0 }) if name == "total_revenue"
    ));

    let instruction = resolver
        .resolve_instruction_entry("{{ custom_instructions('fiscal_calendar') }}")
        .unwrap();
    assert_eq!(instruction.name, "fiscal_calendar");
    assert!(resolver.resolve_instruction_entry("fiscal_calendar").is_ok());

    match resolver.resolve_instruction_entry("fiscal_calender") {
        Err(EntryError::Unresolved(unresolved)) => {
            assert_eq!(unresolved.suggestions, vec!["fiscal_calendar"]);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_table_entries_accept_bare_names_and_markers() {
    let sources = shop();
    let catalog = sources.catalog();
    let definitions = sources.definitions();
    let resolver = Resolver::new(&catalog, &definitions, SuggestionConfig::default());

    assert_eq!(resolver.resolve_table_entry("Orders").unwrap().name, "orders");
    assert_eq!(
        resolver
            .resolve_table_entry("{{ table('customers') }}")
            .unwrap()
            .name,
        "customers"
    );
    assert!(matches!(
        resolver.resolve_table_entry("{{ metric('total_revenue') }}"),
        Err(EntryError::Syntax(_))
    ));

    let tables = resolver.resolve_tables(&[
        "orders".to_string(),
        "nope".to_string(),
        "{{ table('customers') }}".to_string(),
    ]);
    let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["orders", "customers"]);
}

#[test]
fn test_syntax_errors_do_not_resolve_anything() {
    let sources = shop();
    let catalog = sources.catalog();
    let definitions = sources.definitions();
    let resolver = Resolver::new(&catalog, &definitions, SuggestionConfig::default());
    let owner = EntityId::new(EntityKind::Metric, "broken");

    let resolution = resolver.resolve(&owner, "SUM({{ column('orders', 'amount') )");
    assert!(resolution.template.is_none());
    assert!(!resolution.syntax_errors.is_empty());
    assert!(resolution.resolved.is_empty());

    let resolution = resolver.resolve(&owner, "{{ colum('orders', 'amount') }}");
    assert!(!resolution.syntax_errors.is_empty());
}

#[test]
fn test_cache_is_shared_across_threads() {
    let sources = shop();
    let catalog = sources.catalog();
    let definitions = sources.definitions();
    let resolver = Resolver::new(&catalog, &definitions, SuggestionConfig::default());
    let owner = EntityId::new(EntityKind::Metric, "total_revenue");
    let text = "SUM({{ column('orders', 'amount') }})";

    let first = resolver.resolve(&owner, text);
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let again = resolver.resolve(&owner, text);
                assert!(Arc::ptr_eq(&first, &again));
            });
        }
    });
    assert_eq!(resolver.cached(), 1);
}

#[test]
fn test_suggestions_are_deterministic_and_bounded() {
    let candidates = ["orders", "order_items", "orderz", "customers", "ordres"];
    let config = SuggestionConfig::default();

    let first = suggest("order", candidates, &config);
    let second = suggest("order", candidates, &config);
    assert_eq!(first, second);
    assert!(first.len() <= config.limit);
    assert_eq!(first[0], "orders");
    assert!(!first.contains(&"customers".to_string()));

    let strict = SuggestionConfig {
        threshold: 1.0,
        limit: 3,
    };
    assert!(suggest("order", candidates, &strict).is_empty());
}

#[test]
fn test_definitions_fixture_is_clean() {
    // Every marker in the shop fixture resolves.
    assert!(SHOP_DEFINITIONS.contains("{{ metric('total_revenue') }}"));
    let report = shop().validate(false);
    assert!(
        report.findings().iter().all(|f| f.rule != "references"),
        "{:?}",
        report.findings()
    );
}
