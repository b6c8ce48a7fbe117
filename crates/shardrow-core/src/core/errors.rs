// crates/shardrow-core/src/core/errors.rs
// ============================================================================
// Module: Shardrow Errors
// Description: Error kinds surfaced by the storage layer.
// Purpose: Provide stable, matchable error variants for callers.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every fallible storage operation returns [`StoreError`]. Variants are
//! stable for programmatic handling. Readonly and missing-attribute
//! violations are raised before any physical write; configuration errors are
//! raised at store construction and are fatal. Backend errors propagate
//! unwrapped; this layer performs no retry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::interfaces::BackendError;

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Errors surfaced by the sharded storage layer.
///
/// # Invariants
/// - `ReadonlyAttribute` is raised at the point of assignment, never deferred
///   to save time.
/// - `MissingRequiredAttribute` is raised before any physical write.
/// - `Configuration` is raised at store construction only.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Assignment targeted a column declared by an index on the entity.
    #[error("attribute {attribute} cannot be modified because it is part of the {index} index")]
    ReadonlyAttribute {
        /// Attribute name the caller attempted to assign.
        attribute: String,
        /// Name of the index declaring the attribute.
        index: String,
    },
    /// An index write was missing the shard-on column or a declared column.
    #[error("missing required attribute {attribute} for index {index}")]
    MissingRequiredAttribute {
        /// Missing attribute name.
        attribute: String,
        /// Name of the index requiring the attribute.
        index: String,
    },
    /// Invalid static configuration (fatal, raised at construction).
    #[error("store configuration error: {0}")]
    Configuration(String),
    /// Invalid declarative schema (fatal, raised at registration).
    #[error("model schema error: {0}")]
    Schema(String),
    /// Cell body could not be encoded or decoded.
    #[error("body codec error: {0}")]
    Codec(String),
    /// A value could not be used for shard routing.
    #[error("value is not shardable: {0}")]
    NotShardable(String),
    /// A stored row was missing a column or carried an unexpected type.
    #[error("invalid stored row: {0}")]
    InvalidRow(String),
    /// A cell name outside the declared schema was referenced.
    #[error("unknown cell {0}")]
    UnknownCell(String),
    /// A shard number outside the configured range was referenced.
    #[error("shard {shard} out of range (shards_count {shards_count})")]
    ShardOutOfRange {
        /// Requested shard number.
        shard: u32,
        /// Configured total shard count.
        shards_count: u32,
    },
    /// Backend-surfaced error, propagated unwrapped.
    #[error(transparent)]
    Backend(#[from] BackendError),
}
