// crates/shardrow-core/src/core/model.rs
// ============================================================================
// Module: Shardrow Model
// Description: Entity aggregate composing an identifier with named cells.
// Purpose: Own upsert semantics, index maintenance, and the change-feed scan.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! A model is one attached entity type: a validated schema bound to a store.
//! Writes enter through [`Model::put`], which either revises an existing
//! entity matched by the primary index or creates a fresh one, saving the
//! base cell and fanning out a projection to every declared index. Reads
//! resolve through an index lookup or directly by identifier, loading cells
//! lazily on first access.
//!
//! The base-cell save and the index writes are not transactional: a crash
//! between them leaves an entity visible by identifier but not yet by index
//! lookup. No compensating rollback is performed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::cell::Cell;
use crate::core::errors::StoreError;
use crate::core::identifiers::BASE_CELL;
use crate::core::identifiers::CellName;
use crate::core::identifiers::EntityUuid;
use crate::core::index::Index;
use crate::core::schema::ModelSchema;
use crate::core::store::Store;
use crate::core::value::AttributeMap;
use crate::core::value::Value;
use crate::interfaces::FilterClause;
use crate::interfaces::SelectOptions;

// ============================================================================
// SECTION: Model
// ============================================================================

/// Shared model state behind the cheap-to-clone handle.
struct ModelInner {
    /// Store this model is attached to.
    store: Store,
    /// Validated declarative schema.
    schema: ModelSchema,
    /// Base entity table name (store name prefix + model name).
    table_name: String,
}

/// One attached entity type.
#[derive(Clone)]
pub struct Model {
    /// Shared state.
    inner: Arc<ModelInner>,
}

impl Model {
    /// Binds a validated schema to a store.
    pub(crate) fn new(store: Store, schema: ModelSchema) -> Self {
        let table_name = store.config().name.as_deref().map_or_else(
            || schema.name().to_string(),
            |store_name| format!("{store_name}_{}", schema.name()),
        );
        Self {
            inner: Arc::new(ModelInner {
                store,
                schema,
                table_name,
            }),
        }
    }

    /// Returns the store this model is attached to.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    /// Returns the declarative schema.
    #[must_use]
    pub fn schema(&self) -> &ModelSchema {
        &self.inner.schema
    }

    /// Returns the base entity table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.inner.table_name
    }

    /// Returns the base physical table name for one of this model's indices.
    #[must_use]
    pub fn index_table_name(&self, index_name: &str) -> String {
        format!("{}_{index_name}_index", self.inner.table_name)
    }

    /// Returns a handle to the primary index.
    #[must_use]
    pub fn primary_index(&self) -> Index {
        Index::new(self.clone(), self.inner.schema.primary_index_position())
    }

    /// Returns a handle to a declared index by name.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<Index> {
        self.inner
            .schema
            .indices()
            .iter()
            .position(|index| index.name() == name)
            .map(|position| Index::new(self.clone(), position))
    }

    /// Returns handles to every declared index.
    pub fn indices(&self) -> impl Iterator<Item = Index> + '_ {
        (0 .. self.inner.schema.indices().len()).map(|position| Index::new(self.clone(), position))
    }

    /// Returns an entity handle for a known identifier (cells load lazily).
    #[must_use]
    pub fn entity(&self, uuid: EntityUuid) -> Entity {
        Entity::resolved(self.clone(), uuid)
    }

    /// Upserts an entity keyed by the primary index's declared columns.
    ///
    /// When an entity already satisfies the primary index projection of
    /// `values`, its base cell is revised with the index-declared columns
    /// stripped from the incoming set (they must not be rewritten).
    /// Otherwise a fresh identifier is minted, declared cells are
    /// initialized, the base cell is saved with the full attribute set, and
    /// every declared index receives the new entity's projection. The
    /// base-cell save and index writes are not atomic (see module docs).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingRequiredAttribute`] when the primary
    /// index's required columns are absent, or any routing/backend error.
    pub fn put(&self, values: &AttributeMap) -> Result<Entity, StoreError> {
        let matches = self.primary_index().lookup(values)?;
        if let Some(mut entity) = matches.into_iter().next() {
            let stripped: AttributeMap = values
                .iter()
                .filter(|(key, _)| !self.inner.schema.is_declared_column(key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            entity.update(stripped)?;
            return Ok(entity);
        }
        let uuid = EntityUuid::generate();
        let mut entity = Entity::created(self.clone(), uuid.clone(), values.clone());
        entity.base().save()?;
        let mut index_values = values.clone();
        index_values.insert("uuid", uuid.as_str());
        for index in self.indices() {
            index.put(&index_values)?;
        }
        Ok(entity)
    }

    /// Looks up entities through the primary index.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query is missing the shard-on column
    /// or the lookup fails.
    pub fn lookup(&self, query: &AttributeMap) -> Result<Vec<Entity>, StoreError> {
        self.primary_index().lookup(query)
    }

    /// Scans one shard's change feed: every cell write with row id strictly
    /// greater than `cursor`, ascending by row id, capped at `limit` rows.
    ///
    /// Each returned cell carries its owning entity identifier and cell
    /// name. Calling again with the previous call's last row id enumerates
    /// all writes exactly once each.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the shard is out of range, the scan
    /// fails, or a stored row cannot be mapped.
    pub fn fetch_latest_cells(
        &self,
        shard: u32,
        cursor: i64,
        limit: u64,
    ) -> Result<Vec<Cell>, StoreError> {
        let filters = [FilterClause::gt("id", cursor)];
        let rows = self.inner.store.select_on_shard(
            &self.inner.table_name,
            shard,
            &filters,
            &SelectOptions::ascending_by("id", limit),
        )?;
        rows.iter()
            .map(|row| {
                let uuid = row.get("uuid").and_then(Value::as_str).ok_or_else(|| {
                    StoreError::InvalidRow("entity row missing uuid".to_string())
                })?;
                let name = row.get("column_name").and_then(Value::as_str).ok_or_else(|| {
                    StoreError::InvalidRow("entity row missing column_name".to_string())
                })?;
                Cell::from_row(self.clone(), EntityUuid::new(uuid), CellName::new(name), row)
            })
            .collect()
    }

    /// Returns the highest row id on one shard's table, as a feed watermark.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the shard is out of range or the probe
    /// fails.
    pub fn max_id_on_shard(&self, shard: u32) -> Result<Option<i64>, StoreError> {
        self.inner.store.max_id_on_shard(&self.inner.table_name, shard, "id")
    }
}

// ============================================================================
// SECTION: Entity
// ============================================================================

/// One logical record: an identifier plus its named, versioned cells.
pub struct Entity {
    /// Owning model handle.
    model: Model,
    /// Entity identifier, minted once and never reassigned.
    uuid: EntityUuid,
    /// Instantiated cells, keyed by name; absent entries load lazily.
    cells: BTreeMap<String, Cell>,
}

impl Entity {
    /// Builds a handle to an existing entity; cells load on first access.
    pub(crate) fn resolved(model: Model, uuid: EntityUuid) -> Self {
        Self {
            model,
            uuid,
            cells: BTreeMap::new(),
        }
    }

    /// Builds a freshly created entity, seeding the base cell body and
    /// initializing every declared auxiliary cell as empty and unsaved.
    pub(crate) fn created(model: Model, uuid: EntityUuid, body: AttributeMap) -> Self {
        let mut cells = BTreeMap::new();
        cells.insert(
            BASE_CELL.to_string(),
            Cell::primed(model.clone(), uuid.clone(), CellName::base(), body),
        );
        for name in model.schema().cells() {
            cells.insert(
                name.as_str().to_string(),
                Cell::primed(model.clone(), uuid.clone(), name.clone(), AttributeMap::new()),
            );
        }
        Self { model, uuid, cells }
    }

    /// Returns the entity identifier.
    #[must_use]
    pub const fn uuid(&self) -> &EntityUuid {
        &self.uuid
    }

    /// Returns the base cell holding the primary attribute set.
    pub fn base(&mut self) -> &mut Cell {
        let model = self.model.clone();
        let uuid = self.uuid.clone();
        self.cells
            .entry(BASE_CELL.to_string())
            .or_insert_with(|| Cell::unloaded(model, uuid, CellName::base()))
    }

    /// Returns a declared cell by name, instantiating it on first reference.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownCell`] when `name` is neither the base
    /// cell nor a declared auxiliary cell.
    pub fn cell(&mut self, name: &str) -> Result<&mut Cell, StoreError> {
        if !self.model.schema().declares_cell(name) {
            return Err(StoreError::UnknownCell(name.to_string()));
        }
        let model = self.model.clone();
        let uuid = self.uuid.clone();
        Ok(self
            .cells
            .entry(name.to_string())
            .or_insert_with(|| Cell::unloaded(model, uuid, CellName::new(name))))
    }

    /// Returns a base-cell attribute.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading the base cell fails.
    pub fn get(&mut self, key: &str) -> Result<Option<Value>, StoreError> {
        self.base().get(key)
    }

    /// Assigns a base-cell attribute in memory (does not persist).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ReadonlyAttribute`] when `key` is declared by
    /// any index, or a load error.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), StoreError> {
        self.base().set(key, value)
    }

    /// Saves a new base-cell revision carrying the current body.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the save fails.
    pub fn save(&mut self) -> Result<(), StoreError> {
        self.base().save()
    }

    /// Assigns every pair to the base cell, then saves one revision.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ReadonlyAttribute`] when a key is declared by
    /// any index, or any load/save error.
    pub fn update(&mut self, values: AttributeMap) -> Result<(), StoreError> {
        self.base().update(values)
    }

    /// Returns the stored base-cell value under `key`, else `default`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading the base cell fails.
    pub fn fetch(&mut self, key: &str, default: impl Into<Value>) -> Result<Value, StoreError> {
        self.base().fetch(key, default)
    }

    /// Returns the base cell's 0-based revision number.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading the base cell fails.
    pub fn ref_key(&mut self) -> Result<Option<i64>, StoreError> {
        self.base().ref_key()
    }

    /// Returns the base cell's revision timestamp (unix millis).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading the base cell fails.
    pub fn created_at(&mut self) -> Result<Option<i64>, StoreError> {
        self.base().created_at()
    }

    /// Returns the previous base-cell revision, or `None` at revision 0.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading either revision fails.
    pub fn previous(&mut self) -> Result<Option<Cell>, StoreError> {
        self.base().previous()
    }

    /// Returns true iff the base cell has at least one saved revision.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading the base cell fails.
    pub fn is_present(&mut self) -> Result<bool, StoreError> {
        self.base().is_present()
    }

    /// Projects the base cell row into JSON for diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading the base cell fails.
    pub fn as_json(&mut self) -> Result<serde_json::Value, StoreError> {
        self.base().as_json()
    }

    /// Invalidates every instantiated cell's cache.
    ///
    /// The next access re-reads the latest revision from storage; unsaved
    /// in-memory mutations are discarded.
    pub fn reload(&mut self) {
        for cell in self.cells.values_mut() {
            cell.reload();
        }
    }
}
