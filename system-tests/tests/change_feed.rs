// system-tests/tests/change_feed.rs
// ============================================================================
// Module: Change Feed Suite
// Description: Per-shard incremental scan of cell writes in arrival order.
// Purpose: Exercise cursor replay, watermarks, and shard-range errors.
// Dependencies: system-tests harness, shardrow-core
// ============================================================================

//! ## Overview
//! Every cell write lands in its shard's entity table with a monotonically
//! increasing row id, so scanning ascending from a cursor enumerates all
//! writes exactly once each. These scenarios run against a single-shard
//! store so the whole feed is one deterministic sequence.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions and helpers are permitted."
)]

use shardrow_core::StoreError;
use shardrow_core::Value;
use system_tests::harness;

// ============================================================================
// SECTION: Feed Scans
// ============================================================================

#[test]
fn empty_feed_yields_nothing() {
    let store = harness::single_shard_store().expect("store");
    let model = harness::attach_rates(&store).expect("model");

    assert!(model.fetch_latest_cells(0, 0, 10).expect("fetch").is_empty());
    assert_eq!(model.max_id_on_shard(0).expect("watermark"), None);
}

#[test]
fn feed_enumerates_writes_in_arrival_order() {
    let store = harness::single_shard_store().expect("store");
    let model = harness::attach_rates(&store).expect("model");

    let first = model.put(&harness::rate_values(1, 90)).expect("put");
    let second = model.put(&harness::rate_values(2, 80)).expect("put");
    let third = model.put(&harness::rate_values(3, 70)).expect("put");

    let mut cells = model.fetch_latest_cells(0, 0, 10).expect("fetch");
    let uuids: Vec<_> = cells.iter().map(|cell| cell.uuid().clone()).collect();
    assert_eq!(
        uuids,
        vec![first.uuid().clone(), second.uuid().clone(), third.uuid().clone()]
    );
    for cell in &mut cells {
        assert!(cell.name().is_base());
        assert_eq!(cell.ref_key().expect("ref_key"), Some(0));
    }
}

#[test]
fn updates_append_to_the_feed() {
    let store = harness::single_shard_store().expect("store");
    let model = harness::attach_rates(&store).expect("model");

    model.put(&harness::rate_values(1, 90)).expect("create");
    model.put(&harness::rate_values(1, 100)).expect("revise");

    let mut cells = model.fetch_latest_cells(0, 0, 10).expect("fetch");
    assert_eq!(cells.len(), 2);
    let last = cells.last_mut().expect("last write");
    assert_eq!(last.ref_key().expect("ref_key"), Some(1));
    assert_eq!(last.get("net_rate").expect("get"), Some(Value::Integer(100)));
}

#[test]
fn cursor_replay_sees_every_write_exactly_once() {
    let store = harness::single_shard_store().expect("store");
    let model = harness::attach_rates(&store).expect("model");

    for hotel_id in 1 ..= 5 {
        model.put(&harness::rate_values(hotel_id, 90)).expect("put");
    }

    let mut seen = Vec::new();
    let mut cursor = 0;
    loop {
        let mut batch = model.fetch_latest_cells(0, cursor, 2).expect("fetch");
        if batch.is_empty() {
            break;
        }
        assert!(batch.len() <= 2);
        for cell in &mut batch {
            cursor = cell.id().expect("id").expect("stored id");
            seen.push(cell.uuid().clone());
        }
    }
    assert_eq!(seen.len(), 5);
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 5);
}

// ============================================================================
// SECTION: Watermarks and Errors
// ============================================================================

#[test]
fn watermark_tracks_the_latest_write() {
    let store = harness::single_shard_store().expect("store");
    let model = harness::attach_rates(&store).expect("model");

    model.put(&harness::rate_values(1, 90)).expect("put");
    model.put(&harness::rate_values(2, 80)).expect("put");

    let watermark = model.max_id_on_shard(0).expect("watermark").expect("non-empty");
    let mut cells = model.fetch_latest_cells(0, 0, 10).expect("fetch");
    let last = cells.last_mut().expect("last write");
    assert_eq!(last.id().expect("id"), Some(watermark));
    assert!(model.fetch_latest_cells(0, watermark, 10).expect("fetch").is_empty());
}

#[test]
fn out_of_range_shards_are_rejected() {
    let store = harness::single_shard_store().expect("store");
    let model = harness::attach_rates(&store).expect("model");

    assert!(matches!(
        model.fetch_latest_cells(1, 0, 10),
        Err(StoreError::ShardOutOfRange { shard: 1, shards_count: 1 })
    ));
    assert!(matches!(
        model.max_id_on_shard(7),
        Err(StoreError::ShardOutOfRange { shard: 7, .. })
    ));
}
