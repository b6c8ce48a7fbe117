// crates/shardrow-core/src/lib.rs
// ============================================================================
// Module: Shardrow Core Library
// Description: Sharding-aware, versioned wide-row storage layer.
// Purpose: Present the public API surface of the core crate.
// Dependencies: serde, rmp-serde, serde_json, thiserror, time, toml, uuid
// ============================================================================

//! ## Overview
//! Shardrow presents a versioned, wide-row data model over a collection of
//! independently addressable relational partitions. Entities are addressed
//! by UUID and routed to logical shards; every write is preserved as an
//! immutable, timestamped, monotonically versioned revision (a cell), and
//! declarative secondary indices provide lookup by non-key attributes. A
//! per-shard incremental cursor streams all writes in arrival order.
//!
//! The relational execution engine is consumed through the [`Partition`]
//! trait; see the companion SQLite backend crate for an implementation.
//!
//! This layer introduces no threading of its own: every operation is one
//! blocking round trip to one partition, and routing is pure, so operations
//! against different shards are safe to issue concurrently.

/// Core domain model.
pub mod core;
/// Backend-agnostic partition interface.
pub mod interfaces;

pub use crate::core::cell::Cell;
pub use crate::core::errors::StoreError;
pub use crate::core::identifiers::BASE_CELL;
pub use crate::core::identifiers::CellName;
pub use crate::core::identifiers::EntityUuid;
pub use crate::core::index::Index;
pub use crate::core::model::Entity;
pub use crate::core::model::Model;
pub use crate::core::schema::ColumnType;
pub use crate::core::schema::IndexSchema;
pub use crate::core::schema::ModelSchema;
pub use crate::core::schema::PRIMARY_INDEX;
pub use crate::core::store::Store;
pub use crate::core::store::StoreConfig;
pub use crate::core::store::entity_table_spec;
pub use crate::core::store::index_table_spec;
pub use crate::core::time::from_rfc3339;
pub use crate::core::time::to_datetime;
pub use crate::core::time::to_rfc3339;
pub use crate::core::time::unix_millis_now;
pub use crate::core::value::AttributeMap;
pub use crate::core::value::Value;
pub use crate::core::value::decode_body;
pub use crate::core::value::encode_body;
pub use crate::core::value::normalize_key;
pub use crate::interfaces::BackendError;
pub use crate::interfaces::ColumnKind;
pub use crate::interfaces::ColumnSpec;
pub use crate::interfaces::FilterClause;
pub use crate::interfaces::FilterOp;
pub use crate::interfaces::Partition;
pub use crate::interfaces::SelectOptions;
pub use crate::interfaces::TableSpec;
