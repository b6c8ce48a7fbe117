// system-tests/src/harness.rs
// ============================================================================
// Module: System Test Harness
// Description: Store and model fixtures shared across system-test scenarios.
// Purpose: Build in-memory stores and canonical rate schemas in one place.
// Dependencies: shardrow-core, shardrow-store-sqlite
// ============================================================================

//! ## Overview
//! Every system-test scenario works against a hotel-rates model: a primary
//! index over (`hotel_id`, `room_type`, `check_in_date`) sharded on
//! `hotel_id`. The helpers here open in-memory stores with a chosen
//! partition/shard layout, attach that model, and create all tables.

// ============================================================================
// SECTION: Imports
// ============================================================================

use shardrow_core::AttributeMap;
use shardrow_core::IndexSchema;
use shardrow_core::Model;
use shardrow_core::ModelSchema;
use shardrow_core::Store;
use shardrow_core::StoreConfig;
use shardrow_core::StoreError;
use shardrow_store_sqlite::open_store;

// ============================================================================
// SECTION: Store Fixtures
// ============================================================================

/// Opens an in-memory store with the given partition/shard layout.
///
/// # Errors
///
/// Returns [`StoreError`] when the layout is invalid or a partition cannot
/// be opened.
pub fn memory_store(partitions: u32, shards: u32) -> Result<Store, StoreError> {
    let config = StoreConfig {
        name: Some("store".to_string()),
        partition_urls: (0 .. partitions).map(|_| "sqlite::memory:".to_string()).collect(),
        shards_count: shards,
        busy_timeout_ms: 5_000,
        legacy_created_at_is_bigint: false,
    };
    open_store(config)
}

/// Opens a single-partition, single-shard store so every write lands on
/// shard zero (change-feed scenarios need one deterministic feed).
///
/// # Errors
///
/// Returns [`StoreError`] when the store cannot be opened.
pub fn single_shard_store() -> Result<Store, StoreError> {
    memory_store(1, 1)
}

// ============================================================================
// SECTION: Model Fixtures
// ============================================================================

/// Builds the canonical hotel-rates schema: one primary index over
/// (`hotel_id`, `room_type`, `check_in_date`), sharded on `hotel_id`.
///
/// # Errors
///
/// Returns [`StoreError::Schema`] when the declaration is invalid.
pub fn rates_schema() -> Result<ModelSchema, StoreError> {
    let primary = IndexSchema::primary()
        .integer("hotel_id")
        .string("room_type")
        .string("check_in_date")
        .shard_on("hotel_id")
        .build()?;
    ModelSchema::builder("rates").index(primary).build()
}

/// Attaches the rates model to a store and creates every physical table.
///
/// # Errors
///
/// Returns [`StoreError`] when attachment or DDL fails.
pub fn attach_rates(store: &Store) -> Result<Model, StoreError> {
    let model = store.attach(rates_schema()?)?;
    store.create_all_tables()?;
    Ok(model)
}

/// Builds the canonical rate attribute set for one hotel.
#[must_use]
pub fn rate_values(hotel_id: i64, net_rate: i64) -> AttributeMap {
    let mut values = AttributeMap::new();
    values.insert("hotel_id", hotel_id);
    values.insert("room_type", "roh");
    values.insert("check_in_date", "2026-04-15");
    values.insert("net_rate", net_rate);
    values
}
