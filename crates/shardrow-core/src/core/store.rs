// crates/shardrow-core/src/core/store.rs
// ============================================================================
// Module: Shardrow Store
// Description: Static configuration, shard/partition routing, and DDL fan-out.
// Purpose: Route every physical read/write to its shard table and partition.
// Dependencies: crate::core, crate::interfaces, serde, toml
// ============================================================================

//! ## Overview
//! The store owns the static routing configuration and the partition
//! connections. Routing is pure and deterministic: a shardable value maps to
//! `value mod shards_count`, a shard maps to `partitions[shard /
//! shards_per_partition]`, and a (base table, shard) pair maps to the base
//! name suffixed with a zero-padded six-digit shard number. There is no
//! runtime state beyond this configuration, so routing is safe under any
//! number of concurrent callers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use serde::Deserialize;

use crate::core::errors::StoreError;
use crate::core::model::Model;
use crate::core::schema::ColumnType;
use crate::core::schema::IndexSchema;
use crate::core::schema::ModelSchema;
use crate::core::value::AttributeMap;
use crate::interfaces::ColumnKind;
use crate::interfaces::ColumnSpec;
use crate::interfaces::FilterClause;
use crate::interfaces::Partition;
use crate::interfaces::SelectOptions;
use crate::interfaces::TableSpec;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Zero-padding width applied to shard numbers in physical table names.
const SHARD_SUFFIX_WIDTH: usize = 6;

/// Default backend busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Length of canonical UUID strings stored in `uuid` columns.
const UUID_COLUMN_LEN: u32 = 36;

// ============================================================================
// SECTION: Config
// ============================================================================

/// Static store configuration established once at construction.
///
/// # Invariants
/// - `partition_urls` is non-empty.
/// - `shards_count` is greater than zero and evenly divisible by the
///   partition count; a non-integral division is a configuration error.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Optional store name prefixed onto model table names.
    #[serde(default)]
    pub name: Option<String>,
    /// Partition connection URLs, one per physical partition.
    pub partition_urls: Vec<String>,
    /// Total logical shard count across all partitions.
    pub shards_count: u32,
    /// Backend busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Stores `created_at` as an integer millisecond epoch when true.
    #[serde(default)]
    pub legacy_created_at_is_bigint: bool,
}

/// Returns the default backend busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl StoreConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Configuration`] when the document does not parse
    /// or fails validation.
    pub fn from_toml_str(text: &str) -> Result<Self, StoreError> {
        let config: Self =
            toml::from_str(text).map_err(|err| StoreError::Configuration(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration, failing fast on malformed routing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Configuration`] when partitions are missing, the
    /// shard count is zero, or shards do not divide evenly across partitions.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.partition_urls.is_empty() {
            return Err(StoreError::Configuration("no partition urls configured".to_string()));
        }
        if self.shards_count == 0 {
            return Err(StoreError::Configuration(
                "shards_count must be greater than zero".to_string(),
            ));
        }
        let partitions = self.partitions_count();
        if self.shards_count % partitions != 0 {
            return Err(StoreError::Configuration(format!(
                "shards_count {} is not evenly divisible by {partitions} partitions",
                self.shards_count
            )));
        }
        Ok(())
    }

    /// Returns the configured partition count.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, reason = "Partition lists are small.")]
    pub fn partitions_count(&self) -> u32 {
        self.partition_urls.len() as u32
    }

    /// Returns the number of contiguous shards hosted per partition.
    #[must_use]
    pub fn shards_per_partition(&self) -> u32 {
        self.shards_count / self.partitions_count()
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Shared store state behind the cheap-to-clone handle.
struct StoreInner {
    /// Static routing configuration.
    config: StoreConfig,
    /// Partition connections, one per configured URL, in order.
    partitions: Vec<Arc<dyn Partition>>,
    /// Models attached to this store, registered for DDL fan-out.
    models: Mutex<Vec<Model>>,
}

/// Sharding-aware store routing every physical access to one partition.
///
/// # Invariants
/// - Routing is pure given the static configuration; clones share state.
#[derive(Clone)]
pub struct Store {
    /// Shared state.
    inner: Arc<StoreInner>,
}

impl Store {
    /// Builds a store from validated configuration and connected partitions.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Configuration`] when the configuration is
    /// invalid or the partition list does not match the configured URLs.
    pub fn new(
        config: StoreConfig,
        partitions: Vec<Arc<dyn Partition>>,
    ) -> Result<Self, StoreError> {
        config.validate()?;
        if partitions.len() != config.partition_urls.len() {
            return Err(StoreError::Configuration(format!(
                "{} partitions connected but {} urls configured",
                partitions.len(),
                config.partition_urls.len()
            )));
        }
        Ok(Self {
            inner: Arc::new(StoreInner {
                config,
                partitions,
                models: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Maps a shardable value to its logical shard.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, reason = "Bounded by shards_count modulo.")]
    pub fn shard_for(&self, shardable_value: u64) -> u32 {
        (shardable_value % u64::from(self.inner.config.shards_count)) as u32
    }

    /// Maps a logical shard to its hosting partition.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShardOutOfRange`] when `shard` exceeds the
    /// configured shard count.
    pub fn partition_for(&self, shard: u32) -> Result<&Arc<dyn Partition>, StoreError> {
        if shard >= self.inner.config.shards_count {
            return Err(StoreError::ShardOutOfRange {
                shard,
                shards_count: self.inner.config.shards_count,
            });
        }
        let position = (shard / self.inner.config.shards_per_partition()) as usize;
        self.inner.partitions.get(position).ok_or(StoreError::ShardOutOfRange {
            shard,
            shards_count: self.inner.config.shards_count,
        })
    }

    /// Resolves the physical table name for a base name and shard.
    #[must_use]
    pub fn physical_table_name(base_name: &str, shard: u32) -> String {
        format!("{base_name}_{shard:0width$}", width = SHARD_SUFFIX_WIDTH)
    }

    /// Inserts one row into the shard table resolved from `shardable_value`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when routing fails or the backend rejects the
    /// write (uniqueness violations surface unwrapped).
    pub fn put(
        &self,
        table_name: &str,
        shardable_value: u64,
        row: &AttributeMap,
    ) -> Result<i64, StoreError> {
        let shard = self.shard_for(shardable_value);
        let partition = self.partition_for(shard)?;
        let table = Self::physical_table_name(table_name, shard);
        Ok(partition.insert(&table, row)?)
    }

    /// Selects rows from the shard table resolved from `shardable_value`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when routing fails or the select fails.
    pub fn select(
        &self,
        table_name: &str,
        shardable_value: u64,
        filters: &[FilterClause],
        options: &SelectOptions,
    ) -> Result<Vec<AttributeMap>, StoreError> {
        self.select_on_shard(table_name, self.shard_for(shardable_value), filters, options)
    }

    /// Selects rows from an explicit shard's table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the shard is out of range or the select
    /// fails.
    pub fn select_on_shard(
        &self,
        table_name: &str,
        shard: u32,
        filters: &[FilterClause],
        options: &SelectOptions,
    ) -> Result<Vec<AttributeMap>, StoreError> {
        let partition = self.partition_for(shard)?;
        let table = Self::physical_table_name(table_name, shard);
        Ok(partition.select(&table, filters, options)?)
    }

    /// Returns the highest row id on an explicit shard's table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the shard is out of range or the probe
    /// fails.
    pub fn max_id_on_shard(
        &self,
        table_name: &str,
        shard: u32,
        column: &str,
    ) -> Result<Option<i64>, StoreError> {
        let partition = self.partition_for(shard)?;
        let table = Self::physical_table_name(table_name, shard);
        Ok(partition.max_id(&table, column)?)
    }

    /// Attaches an entity type to this store, validating its schema.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Schema`] when the schema is invalid, or
    /// [`StoreError::Configuration`] when the registration lock is poisoned.
    pub fn attach(&self, schema: ModelSchema) -> Result<Model, StoreError> {
        let model = Model::new(self.clone(), schema);
        let mut models = self
            .inner
            .models
            .lock()
            .map_err(|_| StoreError::Configuration("model registry poisoned".to_string()))?;
        models.push(model.clone());
        Ok(model)
    }

    /// Creates every physical table for every attached model on every shard.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when any DDL statement fails.
    pub fn create_all_tables(&self) -> Result<(), StoreError> {
        let models = self
            .inner
            .models
            .lock()
            .map_err(|_| StoreError::Configuration("model registry poisoned".to_string()))?
            .clone();
        let entity_spec = entity_table_spec(self.inner.config.legacy_created_at_is_bigint);
        for model in &models {
            self.create_sharded_table(model.table_name(), &entity_spec)?;
            for index in model.schema().indices() {
                let spec = index_table_spec(index);
                self.create_sharded_table(&model.index_table_name(index.name()), &spec)?;
            }
        }
        Ok(())
    }

    /// Issues one table's DDL across every shard and its resolved partition.
    fn create_sharded_table(&self, base_name: &str, spec: &TableSpec) -> Result<(), StoreError> {
        for shard in 0 .. self.inner.config.shards_count {
            let partition = self.partition_for(shard)?;
            let table = Self::physical_table_name(base_name, shard);
            partition.create_table(&table, spec)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Table Specifications
// ============================================================================

/// Builds the per-shard entity table declaration.
///
/// Every cell of every name for every entity on a shard lands in this one
/// table; the unique constraint turns concurrent same-revision saves into a
/// surfaced conflict.
#[must_use]
pub fn entity_table_spec(legacy_created_at_is_bigint: bool) -> TableSpec {
    let created_at_kind = if legacy_created_at_is_bigint {
        ColumnKind::BigInt
    } else {
        ColumnKind::Timestamp
    };
    TableSpec {
        columns: vec![
            ColumnSpec::required("id", ColumnKind::PrimaryKey),
            ColumnSpec::required("uuid", ColumnKind::Varchar(UUID_COLUMN_LEN)),
            ColumnSpec::required("column_name", ColumnKind::Text),
            ColumnSpec::required("ref_key", ColumnKind::Integer),
            ColumnSpec::nullable("body", ColumnKind::Blob),
            ColumnSpec::required("created_at", created_at_kind),
        ],
        unique: vec![vec![
            "uuid".to_string(),
            "column_name".to_string(),
            "ref_key".to_string(),
        ]],
    }
}

/// Builds the per-shard index table declaration for one index schema.
///
/// The uniqueness constraint spans the declared columns only (never the
/// uuid), so two entities cannot collide on identical index-column values
/// within one shard table.
#[must_use]
pub fn index_table_spec(index: &IndexSchema) -> TableSpec {
    let mut columns = vec![ColumnSpec::required("uuid", ColumnKind::Varchar(UUID_COLUMN_LEN))];
    for column in index.columns() {
        let kind = match column.column_type {
            ColumnType::Integer => ColumnKind::Integer,
            ColumnType::String => ColumnKind::Text,
        };
        columns.push(ColumnSpec::required(column.name.clone(), kind));
    }
    let unique = vec![index.columns().iter().map(|column| column.name.clone()).collect()];
    TableSpec { columns, unique }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
