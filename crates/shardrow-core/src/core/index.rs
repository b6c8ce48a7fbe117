// crates/shardrow-core/src/core/index.rs
// ============================================================================
// Module: Shardrow Index
// Description: Declarative secondary index with sharded-by-value lookup.
// Purpose: Maintain denormalized unique lookup tables over declared columns.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! An index routes by the literal value of its designated shard-on column,
//! not by entity identifier: a lookup query supplies that same value, so both
//! sides resolve the same shard. Each index row projects the declared
//! columns plus the entity identifier; the physical table enforces
//! uniqueness across the declared columns (identifier excluded).

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::errors::StoreError;
use crate::core::identifiers::EntityUuid;
use crate::core::model::Entity;
use crate::core::model::Model;
use crate::core::schema::IndexSchema;
use crate::core::value::AttributeMap;
use crate::core::value::Value;
use crate::interfaces::FilterClause;
use crate::interfaces::SelectOptions;

// ============================================================================
// SECTION: Index
// ============================================================================

/// Handle to one declared index of a model.
#[derive(Clone)]
pub struct Index {
    /// Owning model handle.
    model: Model,
    /// Position of this index within the model schema.
    position: usize,
}

impl Index {
    /// Creates a handle for the index at `position` in the model schema.
    pub(crate) const fn new(model: Model, position: usize) -> Self {
        Self { model, position }
    }

    /// Returns the declarative schema of this index.
    #[must_use]
    pub fn schema(&self) -> &IndexSchema {
        &self.model.schema().indices()[self.position]
    }

    /// Returns the index name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.schema().name()
    }

    /// Returns the base physical table name of this index.
    #[must_use]
    pub fn table_name(&self) -> String {
        self.model.index_table_name(self.name())
    }

    /// Returns true when `key` names a declared column of this index.
    #[must_use]
    pub fn is_declared_column(&self, key: &str) -> bool {
        self.schema().is_declared_column(key)
    }

    /// Writes one denormalized index row for an entity.
    ///
    /// Requires the shard-on column, every declared column, and the entity
    /// identifier to be present in `values`; the row contains exactly the
    /// declared columns plus the identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingRequiredAttribute`] before any physical
    /// write when a required attribute is absent, or a backend error (a
    /// duplicate projection surfaces as a constraint violation).
    pub fn put(&self, values: &AttributeMap) -> Result<(), StoreError> {
        let schema = self.schema();
        let shardable = self.shardable_from(values)?;
        let mut row = AttributeMap::new();
        for column in schema.columns() {
            let value = values.get(&column.name).ok_or_else(|| {
                StoreError::MissingRequiredAttribute {
                    attribute: column.name.clone(),
                    index: schema.name().to_string(),
                }
            })?;
            row.insert(column.name.clone(), value.clone());
        }
        let uuid = values.get("uuid").ok_or_else(|| StoreError::MissingRequiredAttribute {
            attribute: "uuid".to_string(),
            index: schema.name().to_string(),
        })?;
        row.insert("uuid", uuid.clone());
        self.model.store().put(&self.table_name(), shardable, &row)?;
        Ok(())
    }

    /// Looks up entities matching the declared-column subset of `query`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingRequiredAttribute`] when the shard-on
    /// column is absent from `query`, or a routing/backend error.
    pub fn lookup(&self, query: &AttributeMap) -> Result<Vec<Entity>, StoreError> {
        self.lookup_where(query, |_| true)
    }

    /// Looks up entities, refined by a caller-supplied row predicate.
    ///
    /// The shard is resolved from the query's shard-on value; declared
    /// columns present in `query` become equality filters (missing declared
    /// columns are simply not filtered on); the predicate then runs over the
    /// matching index rows. Results come back in storage order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingRequiredAttribute`] when the shard-on
    /// column is absent from `query`, or a routing/backend error.
    pub fn lookup_where(
        &self,
        query: &AttributeMap,
        predicate: impl Fn(&AttributeMap) -> bool,
    ) -> Result<Vec<Entity>, StoreError> {
        let schema = self.schema();
        let shardable = self.shardable_from(query)?;
        let filters: Vec<FilterClause> = schema
            .columns()
            .iter()
            .filter_map(|column| {
                query
                    .get(&column.name)
                    .map(|value| FilterClause::eq(column.name.clone(), value.clone()))
            })
            .collect();
        let rows = self.model.store().select(
            &self.table_name(),
            shardable,
            &filters,
            &SelectOptions::default(),
        )?;
        rows.iter()
            .filter(|row| predicate(row))
            .map(|row| {
                let uuid = row.get("uuid").and_then(Value::as_str).ok_or_else(|| {
                    StoreError::InvalidRow(format!(
                        "index row in {} missing uuid",
                        self.table_name()
                    ))
                })?;
                Ok(self.model.entity(EntityUuid::new(uuid)))
            })
            .collect()
    }

    /// Resolves the routing value from an attribute map's shard-on column.
    fn shardable_from(&self, values: &AttributeMap) -> Result<u64, StoreError> {
        let schema = self.schema();
        let value = values.get(schema.shard_on()).ok_or_else(|| {
            StoreError::MissingRequiredAttribute {
                attribute: schema.shard_on().to_string(),
                index: schema.name().to_string(),
            }
        })?;
        value.shardable_value()
    }
}
