// crates/shardrow-core/src/interfaces/mod.rs
// ============================================================================
// Module: Shardrow Interfaces
// Description: Backend-agnostic interface to the relational execution engine.
// Purpose: Define the contract surface consumed from each partition backend.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! A partition is one independently addressable relational connection. The
//! storage layer consumes a deliberately small surface from it: filtered
//! inserts and selects against a named table, table DDL, and a max-id probe.
//! Queries are restricted to equality/greater-than filters over named
//! columns; no general SQL surface is exposed. Backend errors propagate
//! unwrapped; uniqueness violations are surfaced, never retried.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::value::AttributeMap;
use crate::core::value::Value;

// ============================================================================
// SECTION: Backend Errors
// ============================================================================

/// Errors surfaced by a partition backend.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - `Constraint` covers uniqueness violations on physical tables.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Connection could not be established or was lost.
    #[error("backend connection error: {0}")]
    Connection(String),
    /// Statement execution failed.
    #[error("backend db error: {0}")]
    Db(String),
    /// A table constraint (uniqueness) rejected the write.
    #[error("backend constraint violation: {0}")]
    Constraint(String),
    /// Stored data could not be mapped to the expected shape.
    #[error("backend invalid data: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Filters and Options
// ============================================================================

/// Comparison operator permitted in backend filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Column equals the value.
    Eq,
    /// Column is strictly greater than the value.
    Gt,
}

/// One filter clause applied to a select.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    /// Filtered column name.
    pub column: String,
    /// Comparison operator.
    pub op: FilterOp,
    /// Comparison value.
    pub value: Value,
}

impl FilterClause {
    /// Builds an equality clause.
    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    /// Builds a strictly-greater-than clause.
    #[must_use]
    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Gt,
            value: value.into(),
        }
    }
}

/// Ordering and limit options applied to a select.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOptions {
    /// Column to order by; storage order when absent.
    pub order_by: Option<String>,
    /// Orders descending when true (ascending otherwise).
    pub descending: bool,
    /// Maximum number of rows returned.
    pub limit: Option<u64>,
}

impl SelectOptions {
    /// Options selecting the single highest row by `column`.
    #[must_use]
    pub fn latest_by(column: impl Into<String>) -> Self {
        Self {
            order_by: Some(column.into()),
            descending: true,
            limit: Some(1),
        }
    }

    /// Options scanning ascending by `column`, capped at `limit` rows.
    #[must_use]
    pub fn ascending_by(column: impl Into<String>, limit: u64) -> Self {
        Self {
            order_by: Some(column.into()),
            descending: false,
            limit: Some(limit),
        }
    }
}

// ============================================================================
// SECTION: Table Specifications
// ============================================================================

/// Physical column kind understood by backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Auto-incrementing integer primary key.
    PrimaryKey,
    /// Fixed-length string column.
    Varchar(u32),
    /// Variable-length text column.
    Text,
    /// 64-bit integer column.
    Integer,
    /// 64-bit integer column (legacy created-at representation).
    BigInt,
    /// Opaque binary blob column.
    Blob,
    /// Native timestamp column.
    Timestamp,
}

/// One physical column declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Physical column kind.
    pub kind: ColumnKind,
    /// Whether NULL values are permitted.
    pub nullable: bool,
}

impl ColumnSpec {
    /// Builds a non-nullable column.
    #[must_use]
    pub fn required(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
        }
    }

    /// Builds a nullable column.
    #[must_use]
    pub fn nullable(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: true,
        }
    }
}

/// Full physical table declaration issued as DDL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    /// Ordered column declarations.
    pub columns: Vec<ColumnSpec>,
    /// Uniqueness constraints, each across a set of column names.
    pub unique: Vec<Vec<String>>,
}

// ============================================================================
// SECTION: Partition Backend
// ============================================================================

/// One independently addressable relational partition connection.
///
/// Implementations must be safe to call from concurrent callers; every
/// operation is a single self-contained statement against one table.
pub trait Partition: Send + Sync {
    /// Inserts one row and returns the storage-assigned row id.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on execution failure; uniqueness violations
    /// surface as [`BackendError::Constraint`].
    fn insert(&self, table: &str, row: &AttributeMap) -> Result<i64, BackendError>;

    /// Selects rows matching every filter clause, ordered and limited per
    /// `options`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on execution failure.
    fn select(
        &self,
        table: &str,
        filters: &[FilterClause],
        options: &SelectOptions,
    ) -> Result<Vec<AttributeMap>, BackendError>;

    /// Creates the physical table described by `spec` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on DDL failure.
    fn create_table(&self, table: &str, spec: &TableSpec) -> Result<(), BackendError>;

    /// Returns the highest value in `column`, or `None` for an empty table.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on execution failure.
    fn max_id(&self, table: &str, column: &str) -> Result<Option<i64>, BackendError>;
}
