// system-tests/tests/storage.rs
// ============================================================================
// Module: Storage Scenario Suite
// Description: End-to-end upsert, revision, and readonly-guard scenarios.
// Purpose: Exercise the full write/read path over real SQLite partitions.
// Dependencies: system-tests harness, shardrow-core, shardrow-store-sqlite
// ============================================================================

//! ## Overview
//! The canonical hotel-rates walkthrough: a first `put` creates an entity at
//! revision zero, later puts with the same primary attributes revise it in
//! place, prior revisions stay readable, and index-declared attributes are
//! rejected on mutation.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions and helpers are permitted."
)]

use shardrow_core::AttributeMap;
use shardrow_core::EntityUuid;
use shardrow_core::StoreError;
use shardrow_core::Value;
use system_tests::harness;

// ============================================================================
// SECTION: Upsert Scenarios
// ============================================================================

#[test]
fn first_put_creates_an_entity_at_revision_zero() {
    let store = harness::memory_store(2, 4).expect("store");
    let model = harness::attach_rates(&store).expect("model");

    let mut entity = model.put(&harness::rate_values(1, 90)).expect("put");
    assert_eq!(entity.ref_key().expect("ref_key"), Some(0));
    assert_eq!(entity.get("net_rate").expect("get"), Some(Value::Integer(90)));
    assert_eq!(entity.get("hotel_id").expect("get"), Some(Value::Integer(1)));
    assert!(entity.is_present().expect("present"));
    assert!(entity.created_at().expect("created_at").is_some());
}

#[test]
fn second_put_with_same_primary_attributes_revises_in_place() {
    let store = harness::memory_store(2, 4).expect("store");
    let model = harness::attach_rates(&store).expect("model");

    let first = model.put(&harness::rate_values(1, 90)).expect("first put");
    let mut second = model.put(&harness::rate_values(1, 100)).expect("second put");

    assert_eq!(first.uuid(), second.uuid());
    assert_eq!(second.ref_key().expect("ref_key"), Some(1));
    assert_eq!(second.get("net_rate").expect("get"), Some(Value::Integer(100)));
}

#[test]
fn distinct_primary_attributes_create_distinct_entities() {
    let store = harness::memory_store(2, 4).expect("store");
    let model = harness::attach_rates(&store).expect("model");

    let one = model.put(&harness::rate_values(1, 90)).expect("put");
    let other = model.put(&harness::rate_values(2, 90)).expect("put");
    assert_ne!(one.uuid(), other.uuid());
}

#[test]
fn lookup_resolves_the_stored_entity() {
    let store = harness::memory_store(2, 4).expect("store");
    let model = harness::attach_rates(&store).expect("model");

    let created = model.put(&harness::rate_values(1, 90)).expect("put");
    let mut found = model.lookup(&harness::rate_values(1, 90)).expect("lookup");
    assert_eq!(found.len(), 1);
    let entity = found.first_mut().expect("entity");
    assert_eq!(entity.uuid(), created.uuid());
    assert_eq!(entity.get("net_rate").expect("get"), Some(Value::Integer(90)));
}

// ============================================================================
// SECTION: Revision History
// ============================================================================

#[test]
fn previous_revision_stays_readable_after_update() {
    let store = harness::memory_store(2, 4).expect("store");
    let model = harness::attach_rates(&store).expect("model");

    model.put(&harness::rate_values(1, 90)).expect("first put");
    let mut entity = model.put(&harness::rate_values(1, 100)).expect("second put");

    let mut previous = entity.previous().expect("previous").expect("revision zero");
    assert_eq!(previous.ref_key().expect("ref_key"), Some(0));
    assert_eq!(previous.get("net_rate").expect("get"), Some(Value::Integer(90)));
}

#[test]
fn revision_zero_has_no_previous() {
    let store = harness::memory_store(2, 4).expect("store");
    let model = harness::attach_rates(&store).expect("model");

    let mut entity = model.put(&harness::rate_values(1, 90)).expect("put");
    assert!(entity.previous().expect("previous").is_none());
}

#[test]
fn update_preserves_untouched_attributes() {
    let store = harness::memory_store(2, 4).expect("store");
    let model = harness::attach_rates(&store).expect("model");

    let mut entity = model.put(&harness::rate_values(1, 90)).expect("put");
    let mut changes = AttributeMap::new();
    changes.insert("currency", "USD");
    entity.update(changes).expect("update");

    assert_eq!(entity.ref_key().expect("ref_key"), Some(1));
    assert_eq!(entity.get("net_rate").expect("get"), Some(Value::Integer(90)));
    assert_eq!(entity.get("currency").expect("get"), Some(Value::String("USD".to_string())));
}

#[test]
fn reload_discards_unsaved_mutations() {
    let store = harness::memory_store(2, 4).expect("store");
    let model = harness::attach_rates(&store).expect("model");

    let mut entity = model.put(&harness::rate_values(1, 90)).expect("put");
    entity.set("net_rate", 999_i64).expect("set");
    entity.reload();
    assert_eq!(entity.get("net_rate").expect("get"), Some(Value::Integer(90)));
}

// ============================================================================
// SECTION: Readonly Guard
// ============================================================================

#[test]
fn index_declared_attributes_are_readonly() {
    let store = harness::memory_store(2, 4).expect("store");
    let model = harness::attach_rates(&store).expect("model");

    let mut entity = model.put(&harness::rate_values(1, 90)).expect("put");
    let result = entity.set("hotel_id", 2_i64);
    assert!(matches!(
        result,
        Err(StoreError::ReadonlyAttribute { ref attribute, ref index })
            if attribute == "hotel_id" && index == "primary"
    ));
}

#[test]
fn readonly_guard_normalizes_symbol_style_keys() {
    let store = harness::memory_store(2, 4).expect("store");
    let model = harness::attach_rates(&store).expect("model");

    let mut entity = model.put(&harness::rate_values(1, 90)).expect("put");
    let result = entity.set(":room_type", "suite");
    assert!(matches!(
        result,
        Err(StoreError::ReadonlyAttribute { ref attribute, ref index })
            if attribute == "room_type" && index == "primary"
    ));
}

#[test]
fn update_rejects_index_declared_keys_before_saving() {
    let store = harness::memory_store(2, 4).expect("store");
    let model = harness::attach_rates(&store).expect("model");

    let mut entity = model.put(&harness::rate_values(1, 90)).expect("put");
    let mut changes = AttributeMap::new();
    changes.insert("check_in_date", "2026-05-01");
    assert!(matches!(entity.update(changes), Err(StoreError::ReadonlyAttribute { .. })));
    assert_eq!(entity.ref_key().expect("ref_key"), Some(0));
}

// ============================================================================
// SECTION: Reads and Diagnostics
// ============================================================================

#[test]
fn fetch_falls_back_on_absence_not_falsiness() {
    let store = harness::memory_store(2, 4).expect("store");
    let model = harness::attach_rates(&store).expect("model");

    let mut entity = model.put(&harness::rate_values(1, 90)).expect("put");
    entity.set("available", false).expect("set");
    entity.save().expect("save");

    assert_eq!(entity.fetch("missing", 7_i64).expect("fetch"), Value::Integer(7));
    assert_eq!(entity.fetch("available", true).expect("fetch"), Value::Bool(false));
    assert_eq!(entity.fetch("net_rate", 0_i64).expect("fetch"), Value::Integer(90));
}

#[test]
fn unknown_entities_are_absent() {
    let store = harness::memory_store(2, 4).expect("store");
    let model = harness::attach_rates(&store).expect("model");

    let mut entity = model.entity(EntityUuid::generate());
    assert!(!entity.is_present().expect("present"));
    assert_eq!(entity.ref_key().expect("ref_key"), None);
}

#[test]
fn as_json_projects_the_full_cell_row() {
    let store = harness::memory_store(2, 4).expect("store");
    let model = harness::attach_rates(&store).expect("model");

    let mut entity = model.put(&harness::rate_values(1, 90)).expect("put");
    let json = entity.as_json().expect("json");
    assert_eq!(json["ref_key"], serde_json::json!(0));
    assert_eq!(json["column_name"], serde_json::json!("base"));
    assert_eq!(json["uuid"], serde_json::json!(entity.uuid().as_str()));
    assert_eq!(json["body"]["net_rate"], serde_json::json!(90));
}
