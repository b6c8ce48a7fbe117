// crates/shardrow-store-sqlite/src/lib.rs
// ============================================================================
// Module: Shardrow SQLite Store Library
// Description: SQLite-backed partition implementation for shardrow.
// Purpose: Present the SQLite backend and store constructor.
// Dependencies: shardrow-core, rusqlite
// ============================================================================

//! ## Overview
//! `SQLite` rendition of the [`shardrow_core::Partition`] contract. Each
//! configured partition URL becomes one connection; [`open_store`] wires a
//! full store from a validated configuration.

/// `SQLite` partition backend.
pub mod backend;

pub use backend::SqliteOptions;
pub use backend::SqlitePartition;
pub use backend::open_store;
