// system-tests/tests/indices.rs
// ============================================================================
// Module: Secondary Index Suite
// Description: Declarative index maintenance, lookup, and failure modes.
// Purpose: Exercise named indices, predicate lookups, and routing errors.
// Dependencies: system-tests harness, shardrow-core
// ============================================================================

//! ## Overview
//! Secondary indices route by the literal value of their shard-on column and
//! enforce uniqueness across their declared columns. These scenarios cover
//! named-index lookups, caller-side predicate refinement, missing required
//! attributes, non-routable shard values, and duplicate projections.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions and helpers are permitted."
)]

use shardrow_core::AttributeMap;
use shardrow_core::BackendError;
use shardrow_core::IndexSchema;
use shardrow_core::Model;
use shardrow_core::ModelSchema;
use shardrow_core::Store;
use shardrow_core::StoreError;
use shardrow_core::Value;
use system_tests::harness;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn model_with_secondary_index(store: &Store) -> Model {
    let primary = IndexSchema::primary()
        .integer("hotel_id")
        .string("room_type")
        .string("check_in_date")
        .shard_on("hotel_id")
        .build()
        .expect("primary");
    let secondary = IndexSchema::named("by_rate_code")
        .integer("hotel_id")
        .string("rate_code")
        .shard_on("hotel_id")
        .build()
        .expect("secondary");
    let schema = ModelSchema::builder("rates")
        .index(primary)
        .index(secondary)
        .build()
        .expect("schema");
    let model = store.attach(schema).expect("attach");
    store.create_all_tables().expect("ddl");
    model
}

fn coded_rate_values(hotel_id: i64, rate_code: &str) -> AttributeMap {
    let mut values = harness::rate_values(hotel_id, 90);
    values.insert("rate_code", rate_code);
    values
}

// ============================================================================
// SECTION: Named Index Lookups
// ============================================================================

#[test]
fn named_index_resolves_entities_by_declared_columns() {
    let store = harness::memory_store(2, 4).expect("store");
    let model = model_with_secondary_index(&store);

    let created = model.put(&coded_rate_values(1, "WEEKEND")).expect("put");

    let mut query = AttributeMap::new();
    query.insert("hotel_id", 1_i64);
    query.insert("rate_code", "WEEKEND");
    let index = model.index("by_rate_code").expect("declared index");
    let found = index.lookup(&query).expect("lookup");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].uuid(), created.uuid());
}

#[test]
fn undeclared_index_names_resolve_to_none() {
    let store = harness::memory_store(2, 4).expect("store");
    let model = model_with_secondary_index(&store);
    assert!(model.index("by_rate_code").is_some());
    assert!(model.index("by_color").is_none());
}

#[test]
fn partial_queries_filter_only_on_present_columns() {
    let store = harness::memory_store(2, 4).expect("store");
    let model = model_with_secondary_index(&store);

    model.put(&coded_rate_values(1, "WEEKEND")).expect("put");
    let mut other = coded_rate_values(1, "MIDWEEK");
    other.insert("check_in_date", "2026-04-20");
    model.put(&other).expect("put");

    let mut query = AttributeMap::new();
    query.insert("hotel_id", 1_i64);
    let index = model.index("by_rate_code").expect("declared index");
    let found = index.lookup(&query).expect("lookup");
    assert_eq!(found.len(), 2);
}

#[test]
fn lookup_where_refines_rows_with_a_predicate() {
    let store = harness::memory_store(2, 4).expect("store");
    let model = model_with_secondary_index(&store);

    model.put(&coded_rate_values(1, "WEEKEND")).expect("put");
    let mut other = coded_rate_values(1, "MIDWEEK");
    other.insert("check_in_date", "2026-04-20");
    model.put(&other).expect("put");

    let mut query = AttributeMap::new();
    query.insert("hotel_id", 1_i64);
    let index = model.index("by_rate_code").expect("declared index");
    let found = index
        .lookup_where(&query, |row| {
            row.get("rate_code") == Some(&Value::String("MIDWEEK".to_string()))
        })
        .expect("lookup_where");
    assert_eq!(found.len(), 1);
}

// ============================================================================
// SECTION: Failure Modes
// ============================================================================

#[test]
fn put_requires_every_declared_column() {
    let store = harness::memory_store(2, 4).expect("store");
    let model = model_with_secondary_index(&store);

    let result = model.put(&harness::rate_values(1, 90));
    assert!(matches!(
        result,
        Err(StoreError::MissingRequiredAttribute { ref attribute, ref index })
            if attribute == "rate_code" && index == "by_rate_code"
    ));
}

#[test]
fn lookup_requires_the_shard_on_column() {
    let store = harness::memory_store(2, 4).expect("store");
    let model = model_with_secondary_index(&store);

    let mut query = AttributeMap::new();
    query.insert("rate_code", "WEEKEND");
    let index = model.index("by_rate_code").expect("declared index");
    let result = index.lookup(&query);
    assert!(matches!(
        result,
        Err(StoreError::MissingRequiredAttribute { ref attribute, .. })
            if attribute == "hotel_id"
    ));
}

#[test]
fn non_numeric_shard_values_are_rejected() {
    let store = harness::memory_store(2, 4).expect("store");
    let model = model_with_secondary_index(&store);

    let mut values = coded_rate_values(1, "WEEKEND");
    values.insert("hotel_id", "grand-hotel");
    let result = model.put(&values);
    assert!(matches!(result, Err(StoreError::NotShardable(_))));
}

#[test]
fn numeric_string_shard_values_route_and_store_verbatim() {
    let store = harness::memory_store(2, 4).expect("store");
    let model = model_with_secondary_index(&store);

    let mut values = coded_rate_values(1, "WEEKEND");
    values.insert("hotel_id", "12");
    model.put(&values).expect("put");

    let mut query = AttributeMap::new();
    query.insert("hotel_id", "12");
    query.insert("rate_code", "WEEKEND");
    let index = model.index("by_rate_code").expect("declared index");
    let found = index.lookup(&query).expect("lookup");
    assert_eq!(found.len(), 1);
}

#[test]
fn duplicate_index_projections_violate_uniqueness() {
    let store = harness::memory_store(2, 4).expect("store");
    let model = model_with_secondary_index(&store);

    let entity = model.put(&coded_rate_values(1, "WEEKEND")).expect("put");

    let mut projection = coded_rate_values(1, "WEEKEND");
    projection.insert("uuid", entity.uuid().as_str());
    let index = model.index("by_rate_code").expect("declared index");
    let result = index.put(&projection);
    assert!(matches!(result, Err(StoreError::Backend(BackendError::Constraint(_)))));
}
