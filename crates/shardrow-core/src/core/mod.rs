// crates/shardrow-core/src/core/mod.rs
// ============================================================================
// Module: Shardrow Core
// Description: Domain model of the sharded, versioned wide-row store.
// Purpose: Group identifiers, values, schema, routing, and aggregates.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! Core domain types: entity identifiers, the value model and body codec,
//! declarative schemas, the shard-routing store, and the cell/index/model
//! aggregates built on top of it.

/// Versioned cell container.
pub mod cell;
/// Error kinds surfaced by the storage layer.
pub mod errors;
/// Entity and cell identifiers.
pub mod identifiers;
/// Secondary index subsystem.
pub mod index;
/// Entity aggregate and change feed.
pub mod model;
/// Declarative model/index schemas.
pub mod schema;
/// Configuration, routing, and DDL fan-out.
pub mod store;
/// Revision timestamp helpers.
pub mod time;
/// Attribute values and the body codec.
pub mod value;
