// crates/shardrow-core/src/core/cell.rs
// ============================================================================
// Module: Shardrow Cell
// Description: Named, independently versioned attribute map scoped to an entity.
// Purpose: Provide append-only revisioning with lazy loading and readonly guards.
// Dependencies: crate::core, crate::interfaces, serde_json
// ============================================================================

//! ## Overview
//! A cell is the atomic versioned record: identified by (entity uuid, cell
//! name), carrying a strictly increasing 0-based `ref_key`, a creation
//! timestamp captured at write time, and a string-keyed body. Saving never
//! mutates a prior row; each save appends a new physical row with the next
//! `ref_key`. The "current" value is the row with the highest `ref_key`.
//!
//! `ref_key` is assigned optimistically as highest-known + 1. Two concurrent
//! saves from stale caches can compute the same next revision; the entity
//! table's unique (uuid, column_name, ref_key) constraint surfaces that race
//! as a backend constraint error rather than silent corruption.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::json;

use crate::core::errors::StoreError;
use crate::core::identifiers::CellName;
use crate::core::identifiers::EntityUuid;
use crate::core::model::Model;
use crate::core::time::from_rfc3339;
use crate::core::time::to_rfc3339;
use crate::core::time::unix_millis_now;
use crate::core::value::AttributeMap;
use crate::core::value::Value;
use crate::core::value::decode_body;
use crate::core::value::encode_body;
use crate::core::value::normalize_key;
use crate::interfaces::FilterClause;
use crate::interfaces::SelectOptions;

// ============================================================================
// SECTION: Cell State
// ============================================================================

/// Tri-state load cache: unloaded, loaded-empty, or loaded-with-revision.
#[derive(Debug, Clone)]
enum CellState {
    /// Nothing fetched yet; first access loads the latest revision.
    Unloaded,
    /// Latest revision (or its absence) is cached.
    Loaded(LoadedCell),
}

/// Cached latest-revision state of one cell.
///
/// # Invariants
/// - `ref_key` is `None` iff no revision has ever been saved.
#[derive(Debug, Clone)]
struct LoadedCell {
    /// Storage-assigned row id of the cached revision.
    id: Option<i64>,
    /// 0-based revision number of the cached revision.
    ref_key: Option<i64>,
    /// Creation timestamp (unix millis) of the cached revision.
    created_at: Option<i64>,
    /// In-memory body; assignments mutate this map in place.
    body: AttributeMap,
}

impl LoadedCell {
    /// State for a cell with no saved revision.
    const fn empty() -> Self {
        Self {
            id: None,
            ref_key: None,
            created_at: None,
            body: AttributeMap::new(),
        }
    }

    /// Maps one stored entity-table row into cached cell state.
    fn from_row(row: &AttributeMap) -> Result<Self, StoreError> {
        let id = row
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| StoreError::InvalidRow("missing integer id".to_string()))?;
        let ref_key = row
            .get("ref_key")
            .and_then(Value::as_i64)
            .ok_or_else(|| StoreError::InvalidRow("missing integer ref_key".to_string()))?;
        let created_at = match row.get("created_at") {
            Some(Value::Integer(millis)) => *millis,
            Some(Value::String(text)) => from_rfc3339(text).ok_or_else(|| {
                StoreError::InvalidRow(format!("malformed created_at {text:?}"))
            })?,
            _ => return Err(StoreError::InvalidRow("missing created_at".to_string())),
        };
        let body = match row.get("body") {
            Some(Value::Bytes(bytes)) => decode_body(bytes)?,
            Some(Value::Null) | None => AttributeMap::new(),
            Some(other) => {
                return Err(StoreError::InvalidRow(format!("non-binary body: {other:?}")));
            }
        };
        Ok(Self {
            id: Some(id),
            ref_key: Some(ref_key),
            created_at: Some(created_at),
            body,
        })
    }
}

// ============================================================================
// SECTION: Cell
// ============================================================================

/// One named, independently versioned attribute map of an entity.
#[derive(Clone)]
pub struct Cell {
    /// Owning model handle (store, schema, table naming).
    model: Model,
    /// Owning entity identifier.
    uuid: EntityUuid,
    /// Cell name within the entity.
    name: CellName,
    /// Load cache.
    state: CellState,
}

impl Cell {
    /// Creates an unloaded cell; the first access fetches the latest revision.
    pub(crate) const fn unloaded(model: Model, uuid: EntityUuid, name: CellName) -> Self {
        Self {
            model,
            uuid,
            name,
            state: CellState::Unloaded,
        }
    }

    /// Creates a cell pre-loaded with an in-memory body and no saved revision.
    ///
    /// Used at entity creation to seed the base cell without tripping the
    /// readonly guard on index columns.
    pub(crate) const fn primed(
        model: Model,
        uuid: EntityUuid,
        name: CellName,
        body: AttributeMap,
    ) -> Self {
        Self {
            model,
            uuid,
            name,
            state: CellState::Loaded(LoadedCell {
                id: None,
                ref_key: None,
                created_at: None,
                body,
            }),
        }
    }

    /// Creates a cell bound to a known stored revision row.
    pub(crate) fn from_row(
        model: Model,
        uuid: EntityUuid,
        name: CellName,
        row: &AttributeMap,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            model,
            uuid,
            name,
            state: CellState::Loaded(LoadedCell::from_row(row)?),
        })
    }

    /// Returns the owning entity identifier.
    #[must_use]
    pub const fn uuid(&self) -> &EntityUuid {
        &self.uuid
    }

    /// Returns the cell name.
    #[must_use]
    pub const fn name(&self) -> &CellName {
        &self.name
    }

    /// Returns the attribute stored under `key` in the current body.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading the latest revision fails.
    pub fn get(&mut self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.loaded()?.body.get(key).cloned())
    }

    /// Assigns `value` under `key` in the in-memory body (does not persist).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ReadonlyAttribute`] synchronously when `key` is
    /// a declared column of any index on the owning schema, or a load error.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), StoreError> {
        self.guard_mutation(key)?;
        self.loaded()?.body.insert(key, value.into());
        Ok(())
    }

    /// Returns the stored value when `key` is present, else `default`.
    ///
    /// Presence, not truthiness, decides the fallback: an explicitly stored
    /// false or empty value is returned as stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading the latest revision fails.
    pub fn fetch(&mut self, key: &str, default: impl Into<Value>) -> Result<Value, StoreError> {
        let loaded = self.loaded()?;
        Ok(loaded.body.get(key).cloned().unwrap_or_else(|| default.into()))
    }

    /// Appends a new physical revision carrying the current body.
    ///
    /// Loads current state first, so an unloaded cell picks up the latest
    /// stored revision before advancing it. The new row carries `ref_key`
    /// previous + 1 (or 0 for the first write) and a write-time timestamp,
    /// stored as RFC 3339 text unless the legacy configuration flag selects
    /// integer milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the load, the encode, or the insert fails;
    /// a revision race surfaces as a backend constraint violation.
    pub fn save(&mut self) -> Result<(), StoreError> {
        let (next_ref_key, body_bytes) = {
            let loaded = self.loaded()?;
            (loaded.ref_key.map_or(0, |ref_key| ref_key + 1), encode_body(&loaded.body)?)
        };
        let created_at = unix_millis_now();
        let mut row = AttributeMap::new();
        row.insert("uuid", self.uuid.as_str());
        row.insert("column_name", self.name.as_str());
        row.insert("ref_key", next_ref_key);
        if self.model.store().config().legacy_created_at_is_bigint {
            row.insert("created_at", created_at);
        } else {
            let text = to_rfc3339(created_at).ok_or_else(|| {
                StoreError::InvalidRow(format!("created_at {created_at} out of range"))
            })?;
            row.insert("created_at", text);
        }
        row.insert("body", body_bytes);
        let id =
            self.model.store().put(self.model.table_name(), self.uuid.shardable_value(), &row)?;
        let loaded = self.loaded()?;
        loaded.id = Some(id);
        loaded.ref_key = Some(next_ref_key);
        loaded.created_at = Some(created_at);
        Ok(())
    }

    /// Assigns every key/value pair, then saves one new revision.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ReadonlyAttribute`] before any assignment is
    /// persisted when a key is index-declared, or any load/save error.
    pub fn update(&mut self, values: AttributeMap) -> Result<(), StoreError> {
        for (key, value) in values {
            self.set(&key, value)?;
        }
        self.save()
    }

    /// Returns the cell bound to the immediately preceding revision.
    ///
    /// Returns `None` when this cell has no saved revision or is revision 0.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading either revision fails.
    pub fn previous(&mut self) -> Result<Option<Self>, StoreError> {
        let Some(ref_key) = self.loaded()?.ref_key else {
            return Ok(None);
        };
        if ref_key == 0 {
            return Ok(None);
        }
        let filters = [
            FilterClause::eq("uuid", self.uuid.as_str()),
            FilterClause::eq("column_name", self.name.as_str()),
            FilterClause::eq("ref_key", ref_key - 1),
        ];
        let rows = self.model.store().select(
            self.model.table_name(),
            self.uuid.shardable_value(),
            &filters,
            &SelectOptions::latest_by("ref_key"),
        )?;
        rows.first()
            .map(|row| {
                Self::from_row(self.model.clone(), self.uuid.clone(), self.name.clone(), row)
            })
            .transpose()
    }

    /// Clears cached state so the next access re-reads the latest revision.
    ///
    /// Unsaved in-memory mutations are discarded.
    pub fn reload(&mut self) {
        self.state = CellState::Unloaded;
    }

    /// Returns true iff at least one revision has ever been saved.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading the latest revision fails.
    pub fn is_present(&mut self) -> Result<bool, StoreError> {
        Ok(self.loaded()?.ref_key.is_some())
    }

    /// Returns the 0-based revision number, or `None` before the first save.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading the latest revision fails.
    pub fn ref_key(&mut self) -> Result<Option<i64>, StoreError> {
        Ok(self.loaded()?.ref_key)
    }

    /// Returns the revision timestamp (unix millis), or `None` before the
    /// first save.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading the latest revision fails.
    pub fn created_at(&mut self) -> Result<Option<i64>, StoreError> {
        Ok(self.loaded()?.created_at)
    }

    /// Returns the storage-assigned row id, or `None` before the first save.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading the latest revision fails.
    pub fn id(&mut self) -> Result<Option<i64>, StoreError> {
        Ok(self.loaded()?.id)
    }

    /// Projects the full cell row into JSON for diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading the latest revision fails.
    pub fn as_json(&mut self) -> Result<serde_json::Value, StoreError> {
        let uuid = self.uuid.as_str().to_string();
        let name = self.name.as_str().to_string();
        let loaded = self.loaded()?;
        Ok(json!({
            "id": loaded.id,
            "uuid": uuid,
            "column_name": name,
            "ref_key": loaded.ref_key,
            "body": loaded.body.to_json(),
            "created_at": loaded.created_at,
        }))
    }

    /// Rejects assignment to index-declared columns.
    fn guard_mutation(&self, key: &str) -> Result<(), StoreError> {
        if let Some(index) = self.model.schema().index_declaring(key) {
            return Err(StoreError::ReadonlyAttribute {
                attribute: normalize_key(key).to_string(),
                index: index.name().to_string(),
            });
        }
        Ok(())
    }

    /// Returns the cached latest-revision state, fetching it when unloaded.
    fn loaded(&mut self) -> Result<&mut LoadedCell, StoreError> {
        if matches!(self.state, CellState::Unloaded) {
            let filters = [
                FilterClause::eq("uuid", self.uuid.as_str()),
                FilterClause::eq("column_name", self.name.as_str()),
            ];
            let rows = self.model.store().select(
                self.model.table_name(),
                self.uuid.shardable_value(),
                &filters,
                &SelectOptions::latest_by("ref_key"),
            )?;
            let loaded = match rows.first() {
                Some(row) => LoadedCell::from_row(row)?,
                None => LoadedCell::empty(),
            };
            self.state = CellState::Loaded(loaded);
        }
        match &mut self.state {
            CellState::Loaded(loaded) => Ok(loaded),
            CellState::Unloaded => {
                Err(StoreError::InvalidRow("cell state unavailable after load".to_string()))
            }
        }
    }
}
