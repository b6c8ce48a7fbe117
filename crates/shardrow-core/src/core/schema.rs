// crates/shardrow-core/src/core/schema.rs
// ============================================================================
// Module: Shardrow Declarative Schema
// Description: Static schema descriptions for models and secondary indices.
// Purpose: Validate index/cell declarations once at entity-type registration.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A model's shape is declared once as a static, validated schema: an
//! ordered set of typed index columns with a designated shard-on column,
//! plus the names of any auxiliary cells. Schemas are built through builders
//! and validated at registration time, not by runtime code execution.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::errors::StoreError;
use crate::core::identifiers::BASE_CELL;
use crate::core::identifiers::CellName;
use crate::core::value::normalize_key;

// ============================================================================
// SECTION: Index Schema
// ============================================================================

/// Default name given to a model's primary index.
pub const PRIMARY_INDEX: &str = "primary";

/// Declared type of an index column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// 64-bit signed integer column.
    Integer,
    /// UTF-8 string column.
    String,
}

/// One declared index column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexColumn {
    /// Column name (normalized).
    pub name: String,
    /// Declared column type.
    pub column_type: ColumnType,
}

/// Declarative schema for one secondary index.
///
/// # Invariants
/// - Columns are ordered as declared and non-empty.
/// - The shard-on column is one of the declared columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSchema {
    /// Index name (default `primary`).
    name: String,
    /// Ordered declared columns.
    columns: Vec<IndexColumn>,
    /// Column whose literal value routes index rows to shards.
    shard_on: String,
}

impl IndexSchema {
    /// Starts a builder for an index with the default `primary` name.
    #[must_use]
    pub fn primary() -> IndexSchemaBuilder {
        IndexSchemaBuilder::new(PRIMARY_INDEX)
    }

    /// Starts a builder for a named index.
    #[must_use]
    pub fn named(name: impl Into<String>) -> IndexSchemaBuilder {
        IndexSchemaBuilder::new(name)
    }

    /// Returns the index name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the ordered declared columns.
    #[must_use]
    pub fn columns(&self) -> &[IndexColumn] {
        &self.columns
    }

    /// Returns the shard-on column name.
    #[must_use]
    pub fn shard_on(&self) -> &str {
        &self.shard_on
    }

    /// Returns true when this is the primary index.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.name == PRIMARY_INDEX
    }

    /// Returns true when `key` names a declared column (normalized compare).
    #[must_use]
    pub fn is_declared_column(&self, key: &str) -> bool {
        let key = normalize_key(key);
        self.columns.iter().any(|column| column.name == key)
    }
}

/// Builder assembling one [`IndexSchema`].
#[derive(Debug)]
pub struct IndexSchemaBuilder {
    /// Index name under construction.
    name: String,
    /// Columns declared so far, in order.
    columns: Vec<IndexColumn>,
    /// Designated shard-on column, once declared.
    shard_on: Option<String>,
}

impl IndexSchemaBuilder {
    /// Creates a builder for the given index name.
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            shard_on: None,
        }
    }

    /// Declares an integer column.
    #[must_use]
    pub fn integer(self, name: &str) -> Self {
        self.column(name, ColumnType::Integer)
    }

    /// Declares a string column.
    #[must_use]
    pub fn string(self, name: &str) -> Self {
        self.column(name, ColumnType::String)
    }

    /// Declares a column with an explicit type.
    #[must_use]
    pub fn column(mut self, name: &str, column_type: ColumnType) -> Self {
        self.columns.push(IndexColumn {
            name: normalize_key(name).to_string(),
            column_type,
        });
        self
    }

    /// Designates the column whose value routes index rows to shards.
    #[must_use]
    pub fn shard_on(mut self, name: &str) -> Self {
        self.shard_on = Some(normalize_key(name).to_string());
        self
    }

    /// Finalizes and validates the index schema.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Schema`] when no column is declared, a column is
    /// declared twice, or the shard-on column is missing or undeclared.
    pub fn build(self) -> Result<IndexSchema, StoreError> {
        if self.columns.is_empty() {
            return Err(StoreError::Schema(format!("index {} declares no columns", self.name)));
        }
        for (position, column) in self.columns.iter().enumerate() {
            if self.columns[.. position].iter().any(|other| other.name == column.name) {
                return Err(StoreError::Schema(format!(
                    "index {} declares column {} twice",
                    self.name, column.name
                )));
            }
        }
        let Some(shard_on) = self.shard_on else {
            return Err(StoreError::Schema(format!(
                "index {} declares no shard-on column",
                self.name
            )));
        };
        if !self.columns.iter().any(|column| column.name == shard_on) {
            return Err(StoreError::Schema(format!(
                "index {} shards on undeclared column {shard_on}",
                self.name
            )));
        }
        Ok(IndexSchema {
            name: self.name,
            columns: self.columns,
            shard_on,
        })
    }
}

// ============================================================================
// SECTION: Model Schema
// ============================================================================

/// Declarative schema for one entity type.
///
/// # Invariants
/// - Exactly one index is named `primary`.
/// - Index names and auxiliary cell names are unique; `base` is reserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSchema {
    /// Model name, used for table naming.
    name: String,
    /// Declared secondary indices (primary first is not required).
    indices: Vec<IndexSchema>,
    /// Declared auxiliary cell names (the base cell is implicit).
    cells: Vec<CellName>,
}

impl ModelSchema {
    /// Starts a builder for a model schema.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ModelSchemaBuilder {
        ModelSchemaBuilder {
            name: name.into(),
            indices: Vec::new(),
            cells: Vec::new(),
        }
    }

    /// Returns the model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared indices.
    #[must_use]
    pub fn indices(&self) -> &[IndexSchema] {
        &self.indices
    }

    /// Returns the declared auxiliary cell names.
    #[must_use]
    pub fn cells(&self) -> &[CellName] {
        &self.cells
    }

    /// Returns the position of the primary index.
    #[must_use]
    pub fn primary_index_position(&self) -> usize {
        self.indices.iter().position(IndexSchema::is_primary).unwrap_or(0)
    }

    /// Returns true when `key` is a declared column of any index.
    #[must_use]
    pub fn is_declared_column(&self, key: &str) -> bool {
        self.indices.iter().any(|index| index.is_declared_column(key))
    }

    /// Returns the first index declaring `key`, if any.
    #[must_use]
    pub fn index_declaring(&self, key: &str) -> Option<&IndexSchema> {
        self.indices.iter().find(|index| index.is_declared_column(key))
    }

    /// Returns true when `name` is the base cell or a declared auxiliary cell.
    #[must_use]
    pub fn declares_cell(&self, name: &str) -> bool {
        name == BASE_CELL || self.cells.iter().any(|cell| cell.as_str() == name)
    }
}

/// Builder assembling one [`ModelSchema`].
#[derive(Debug)]
pub struct ModelSchemaBuilder {
    /// Model name under construction.
    name: String,
    /// Indices declared so far.
    indices: Vec<IndexSchema>,
    /// Auxiliary cells declared so far.
    cells: Vec<CellName>,
}

impl ModelSchemaBuilder {
    /// Declares an index on the model.
    #[must_use]
    pub fn index(mut self, index: IndexSchema) -> Self {
        self.indices.push(index);
        self
    }

    /// Declares a named auxiliary cell.
    #[must_use]
    pub fn cell(mut self, name: impl Into<CellName>) -> Self {
        self.cells.push(name.into());
        self
    }

    /// Finalizes and validates the model schema.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Schema`] when no primary index exists, an index
    /// name repeats, a cell name repeats, or a cell is named `base`.
    pub fn build(self) -> Result<ModelSchema, StoreError> {
        if !self.indices.iter().any(IndexSchema::is_primary) {
            return Err(StoreError::Schema(format!(
                "model {} declares no {PRIMARY_INDEX} index",
                self.name
            )));
        }
        for (position, index) in self.indices.iter().enumerate() {
            if self.indices[.. position].iter().any(|other| other.name() == index.name()) {
                return Err(StoreError::Schema(format!(
                    "model {} declares index {} twice",
                    self.name,
                    index.name()
                )));
            }
        }
        for (position, cell) in self.cells.iter().enumerate() {
            if cell.is_base() {
                return Err(StoreError::Schema(format!(
                    "model {} declares reserved cell name {BASE_CELL}",
                    self.name
                )));
            }
            if self.cells[.. position].contains(cell) {
                return Err(StoreError::Schema(format!(
                    "model {} declares cell {cell} twice",
                    self.name
                )));
            }
        }
        Ok(ModelSchema {
            name: self.name,
            indices: self.indices,
            cells: self.cells,
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
