// system-tests/tests/persistence.rs
// ============================================================================
// Module: Persistence Suite
// Description: Durability across store handles and legacy timestamp storage.
// Purpose: Exercise TOML configuration, reopening, and the legacy flag.
// Dependencies: system-tests harness, shardrow-core, shardrow-store-sqlite
// ============================================================================

//! ## Overview
//! File-backed stores built from TOML configuration are reopened and read
//! back: entities, revisions, and timestamps survive the handle; DDL is
//! idempotent on reopen; the legacy flag switches the physical timestamp
//! column without changing in-process values.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions and helpers are permitted."
)]

use shardrow_core::AttributeMap;
use shardrow_core::Partition;
use shardrow_core::SelectOptions;
use shardrow_core::StoreConfig;
use shardrow_core::Value;
use shardrow_core::from_rfc3339;
use shardrow_store_sqlite::SqliteOptions;
use shardrow_store_sqlite::SqlitePartition;
use shardrow_store_sqlite::open_store;
use system_tests::harness;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn file_config_toml(dir: &std::path::Path, legacy: bool) -> String {
    let path = dir.join("partition_0.sqlite3");
    format!(
        r#"
        name = "store"
        partition_urls = ["sqlite:{}"]
        shards_count = 2
        legacy_created_at_is_bigint = {legacy}
        "#,
        path.display()
    )
}

fn raw_entity_rows(dir: &std::path::Path) -> Vec<AttributeMap> {
    let url = format!("sqlite:{}", dir.join("partition_0.sqlite3").display());
    let partition = SqlitePartition::connect(&url, &SqliteOptions::default()).expect("open");
    let mut rows = Vec::new();
    for shard in 0 .. 2 {
        let table = format!("store_rates_{shard:06}");
        rows.extend(partition.select(&table, &[], &SelectOptions::default()).expect("select"));
    }
    rows
}

// ============================================================================
// SECTION: Durability
// ============================================================================

#[test]
fn entities_survive_reopening_the_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let toml_text = file_config_toml(dir.path(), false);

    let (uuid, created_at) = {
        let config = StoreConfig::from_toml_str(&toml_text).expect("config");
        let store = open_store(config).expect("store");
        let model = harness::attach_rates(&store).expect("model");
        let mut entity = model.put(&harness::rate_values(1, 90)).expect("put");
        (entity.uuid().clone(), entity.created_at().expect("created_at").expect("saved"))
    };

    let config = StoreConfig::from_toml_str(&toml_text).expect("config");
    let store = open_store(config).expect("reopened store");
    let model = harness::attach_rates(&store).expect("model");

    let mut found = model.lookup(&harness::rate_values(1, 90)).expect("lookup");
    assert_eq!(found.len(), 1);
    let entity = found.first_mut().expect("entity");
    assert_eq!(entity.uuid(), &uuid);
    assert_eq!(entity.ref_key().expect("ref_key"), Some(0));
    assert_eq!(entity.get("net_rate").expect("get"), Some(Value::Integer(90)));
    assert_eq!(entity.created_at().expect("created_at"), Some(created_at));
}

#[test]
fn revisions_continue_across_handles() {
    let dir = tempfile::tempdir().expect("tempdir");
    let toml_text = file_config_toml(dir.path(), false);

    {
        let config = StoreConfig::from_toml_str(&toml_text).expect("config");
        let store = open_store(config).expect("store");
        let model = harness::attach_rates(&store).expect("model");
        model.put(&harness::rate_values(1, 90)).expect("put");
    }

    let config = StoreConfig::from_toml_str(&toml_text).expect("config");
    let store = open_store(config).expect("reopened store");
    let model = harness::attach_rates(&store).expect("model");

    let mut entity = model.put(&harness::rate_values(1, 100)).expect("revise");
    assert_eq!(entity.ref_key().expect("ref_key"), Some(1));
    let mut previous = entity.previous().expect("previous").expect("revision zero");
    assert_eq!(previous.get("net_rate").expect("get"), Some(Value::Integer(90)));
}

// ============================================================================
// SECTION: Legacy Timestamp Storage
// ============================================================================

#[test]
fn legacy_flag_preserves_millisecond_timestamps() {
    let dir = tempfile::tempdir().expect("tempdir");
    let toml_text = file_config_toml(dir.path(), true);

    let (uuid, created_at) = {
        let config = StoreConfig::from_toml_str(&toml_text).expect("config");
        assert!(config.legacy_created_at_is_bigint);
        let store = open_store(config).expect("store");
        let model = harness::attach_rates(&store).expect("model");
        let mut entity = model.put(&harness::rate_values(1, 90)).expect("put");
        (entity.uuid().clone(), entity.created_at().expect("created_at").expect("saved"))
    };

    let config = StoreConfig::from_toml_str(&toml_text).expect("config");
    let store = open_store(config).expect("reopened store");
    let model = harness::attach_rates(&store).expect("model");

    let mut entity = model.entity(uuid);
    assert_eq!(entity.created_at().expect("created_at"), Some(created_at));
    assert!(created_at > 0);
}

#[test]
fn modern_stores_write_timestamps_as_rfc3339_text() {
    let dir = tempfile::tempdir().expect("tempdir");
    let expected = {
        let config =
            StoreConfig::from_toml_str(&file_config_toml(dir.path(), false)).expect("config");
        let store = open_store(config).expect("store");
        let model = harness::attach_rates(&store).expect("model");
        let mut entity = model.put(&harness::rate_values(1, 90)).expect("put");
        entity.created_at().expect("created_at").expect("saved")
    };

    let rows = raw_entity_rows(dir.path());
    assert_eq!(rows.len(), 1);
    match rows[0].get("created_at") {
        Some(Value::String(text)) => assert_eq!(from_rfc3339(text), Some(expected)),
        other => panic!("expected rfc3339 text, got {other:?}"),
    }
}

#[test]
fn legacy_stores_write_timestamps_as_integer_millis() {
    let dir = tempfile::tempdir().expect("tempdir");
    let expected = {
        let config =
            StoreConfig::from_toml_str(&file_config_toml(dir.path(), true)).expect("config");
        let store = open_store(config).expect("store");
        let model = harness::attach_rates(&store).expect("model");
        let mut entity = model.put(&harness::rate_values(1, 90)).expect("put");
        entity.created_at().expect("created_at").expect("saved")
    };

    let rows = raw_entity_rows(dir.path());
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("created_at"), Some(&Value::Integer(expected)));
}
