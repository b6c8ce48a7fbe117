// crates/shardrow-store-sqlite/src/backend.rs
// ============================================================================
// Module: SQLite Partition Backend
// Description: Partition implementation over rusqlite with generated SQL.
// Purpose: Execute inserts, filtered selects, and DDL for one partition.
// Dependencies: shardrow-core, rusqlite
// ============================================================================

//! ## Overview
//! One [`SqlitePartition`] wraps one `SQLite` connection behind a mutex and
//! implements the [`Partition`] contract with generated, parameterized SQL.
//! Identifiers are validated before interpolation; values always travel as
//! bound parameters. Uniqueness violations surface as
//! [`BackendError::Constraint`] so the storage layer can report revision
//! races instead of corrupting data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::params_from_iter;
use shardrow_core::AttributeMap;
use shardrow_core::BackendError;
use shardrow_core::ColumnKind;
use shardrow_core::FilterClause;
use shardrow_core::FilterOp;
use shardrow_core::Partition;
use shardrow_core::SelectOptions;
use shardrow_core::Store;
use shardrow_core::StoreConfig;
use shardrow_core::StoreError;
use shardrow_core::TableSpec;
use shardrow_core::Value;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Connection options applied to each `SQLite` partition.
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u64,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
        }
    }
}

/// Parsed form of a partition connection URL.
enum SqliteTarget {
    /// Private in-memory database.
    Memory,
    /// On-disk database file.
    File(String),
}

/// Parses a `sqlite:` connection URL.
///
/// `sqlite::memory:` and the bare `sqlite:/` form open an in-memory
/// database; any other suffix is treated as a file path.
fn parse_url(url: &str) -> Result<SqliteTarget, BackendError> {
    let rest = url
        .strip_prefix("sqlite:")
        .ok_or_else(|| BackendError::Connection(format!("unsupported partition url: {url}")))?;
    if rest.is_empty() || rest == ":memory:" || rest == "/" {
        Ok(SqliteTarget::Memory)
    } else {
        Ok(SqliteTarget::File(rest.to_string()))
    }
}

// ============================================================================
// SECTION: Partition
// ============================================================================

/// One `SQLite`-backed partition connection.
///
/// # Invariants
/// - Connection access is serialized through a mutex; every operation is one
///   self-contained statement.
pub struct SqlitePartition {
    /// Shared connection guarded by a mutex.
    connection: Mutex<Connection>,
}

impl SqlitePartition {
    /// Opens a partition from its connection URL.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Connection`] when the URL is unsupported or
    /// the database cannot be opened.
    pub fn connect(url: &str, options: &SqliteOptions) -> Result<Self, BackendError> {
        let connection = match parse_url(url)? {
            SqliteTarget::Memory => Connection::open_in_memory(),
            SqliteTarget::File(path) => Connection::open(path),
        }
        .map_err(|err| BackendError::Connection(err.to_string()))?;
        connection
            .busy_timeout(Duration::from_millis(options.busy_timeout_ms))
            .map_err(|err| BackendError::Connection(err.to_string()))?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Locks the connection, surfacing poisoning as a backend error.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, BackendError> {
        self.connection
            .lock()
            .map_err(|_| BackendError::Db("sqlite connection mutex poisoned".to_string()))
    }
}

impl Partition for SqlitePartition {
    fn insert(&self, table: &str, row: &AttributeMap) -> Result<i64, BackendError> {
        let table = checked_identifier(table)?;
        let mut columns = Vec::with_capacity(row.len());
        let mut params = Vec::with_capacity(row.len());
        for (column, value) in row.iter() {
            columns.push(format!("\"{}\"", checked_identifier(column)?));
            params.push(to_sql_value(value));
        }
        let placeholders: Vec<String> =
            (1 ..= params.len()).map(|position| format!("?{position}")).collect();
        let sql = format!(
            "INSERT INTO \"{table}\" ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );
        let guard = self.lock()?;
        guard.execute(&sql, params_from_iter(params)).map_err(map_db_error)?;
        Ok(guard.last_insert_rowid())
    }

    fn select(
        &self,
        table: &str,
        filters: &[FilterClause],
        options: &SelectOptions,
    ) -> Result<Vec<AttributeMap>, BackendError> {
        let table = checked_identifier(table)?;
        let mut sql = format!("SELECT * FROM \"{table}\"");
        let mut params = Vec::with_capacity(filters.len());
        for (position, clause) in filters.iter().enumerate() {
            let column = checked_identifier(&clause.column)?;
            let keyword = if position == 0 { "WHERE" } else { "AND" };
            let operator = match clause.op {
                FilterOp::Eq => "=",
                FilterOp::Gt => ">",
            };
            sql.push_str(&format!(" {keyword} \"{column}\" {operator} ?{}", position + 1));
            params.push(to_sql_value(&clause.value));
        }
        if let Some(order_by) = &options.order_by {
            let column = checked_identifier(order_by)?;
            let direction = if options.descending { "DESC" } else { "ASC" };
            sql.push_str(&format!(" ORDER BY \"{column}\" {direction}"));
        }
        if let Some(limit) = options.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        let guard = self.lock()?;
        let mut statement = guard.prepare(&sql).map_err(map_db_error)?;
        let column_names: Vec<String> =
            statement.column_names().iter().map(ToString::to_string).collect();
        let mut rows = statement.query(params_from_iter(params)).map_err(map_db_error)?;
        let mut results = Vec::new();
        while let Some(row) = rows.next().map_err(map_db_error)? {
            let mut result = AttributeMap::new();
            for (position, name) in column_names.iter().enumerate() {
                let value: rusqlite::types::Value =
                    row.get(position).map_err(|err| BackendError::Invalid(err.to_string()))?;
                result.insert(name.clone(), from_sql_value(value));
            }
            results.push(result);
        }
        Ok(results)
    }

    fn create_table(&self, table: &str, spec: &TableSpec) -> Result<(), BackendError> {
        let table = checked_identifier(table)?;
        let mut definitions = Vec::with_capacity(spec.columns.len() + spec.unique.len());
        for column in &spec.columns {
            let name = checked_identifier(&column.name)?;
            let mut definition = format!("\"{name}\" {}", column_type_sql(column.kind));
            if !column.nullable && !matches!(column.kind, ColumnKind::PrimaryKey) {
                definition.push_str(" NOT NULL");
            }
            definitions.push(definition);
        }
        for unique in &spec.unique {
            let mut quoted = Vec::with_capacity(unique.len());
            for column in unique {
                quoted.push(format!("\"{}\"", checked_identifier(column)?));
            }
            definitions.push(format!("UNIQUE ({})", quoted.join(", ")));
        }
        let sql =
            format!("CREATE TABLE IF NOT EXISTS \"{table}\" ({})", definitions.join(", "));
        let guard = self.lock()?;
        guard.execute(&sql, []).map_err(map_db_error)?;
        Ok(())
    }

    fn max_id(&self, table: &str, column: &str) -> Result<Option<i64>, BackendError> {
        let table = checked_identifier(table)?;
        let column = checked_identifier(column)?;
        let sql = format!("SELECT MAX(\"{column}\") FROM \"{table}\"");
        let guard = self.lock()?;
        guard
            .query_row(&sql, [], |row| row.get::<_, Option<i64>>(0))
            .map_err(map_db_error)
    }
}

// ============================================================================
// SECTION: SQL Mapping
// ============================================================================

/// Validates an identifier before interpolation into generated SQL.
fn checked_identifier(name: &str) -> Result<&str, BackendError> {
    let valid = !name.is_empty()
        && name.chars().all(|character| character.is_ascii_alphanumeric() || character == '_');
    if valid {
        Ok(name)
    } else {
        Err(BackendError::Invalid(format!("invalid sql identifier {name:?}")))
    }
}

/// Returns the `SQLite` column type for a declared column kind.
const fn column_type_sql(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::PrimaryKey => "INTEGER PRIMARY KEY AUTOINCREMENT",
        ColumnKind::Varchar(_) => "VARCHAR",
        ColumnKind::Text => "TEXT",
        ColumnKind::Integer => "INTEGER",
        ColumnKind::BigInt => "BIGINT",
        ColumnKind::Blob => "BLOB",
        ColumnKind::Timestamp => "TIMESTAMP",
    }
}

/// Converts an attribute value into its bound-parameter form.
fn to_sql_value(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Bool(inner) => rusqlite::types::Value::Integer(i64::from(*inner)),
        Value::Integer(inner) => rusqlite::types::Value::Integer(*inner),
        Value::Float(inner) => rusqlite::types::Value::Real(*inner),
        Value::String(inner) => rusqlite::types::Value::Text(inner.clone()),
        Value::Bytes(inner) => rusqlite::types::Value::Blob(inner.clone()),
    }
}

/// Converts a stored column value back into an attribute value.
///
/// Booleans come back as integers; cell bodies preserve their types through
/// the binary codec, and index columns are declared integer or string, so no
/// information is lost on the read path.
fn from_sql_value(value: rusqlite::types::Value) -> Value {
    match value {
        rusqlite::types::Value::Null => Value::Null,
        rusqlite::types::Value::Integer(inner) => Value::Integer(inner),
        rusqlite::types::Value::Real(inner) => Value::Float(inner),
        rusqlite::types::Value::Text(inner) => Value::String(inner),
        rusqlite::types::Value::Blob(inner) => Value::Bytes(inner),
    }
}

/// Maps a rusqlite error, classifying constraint violations.
fn map_db_error(error: rusqlite::Error) -> BackendError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &error
        && failure.code == ErrorCode::ConstraintViolation
    {
        return BackendError::Constraint(error.to_string());
    }
    BackendError::Db(error.to_string())
}

// ============================================================================
// SECTION: Store Construction
// ============================================================================

/// Connects every configured partition and builds a [`Store`].
///
/// # Errors
///
/// Returns [`StoreError`] when the configuration is invalid or any
/// partition cannot be opened.
pub fn open_store(config: StoreConfig) -> Result<Store, StoreError> {
    config.validate()?;
    let options = SqliteOptions {
        busy_timeout_ms: config.busy_timeout_ms,
    };
    let mut partitions: Vec<std::sync::Arc<dyn Partition>> =
        Vec::with_capacity(config.partition_urls.len());
    for url in &config.partition_urls {
        partitions.push(std::sync::Arc::new(SqlitePartition::connect(url, &options)?));
    }
    Store::new(config, partitions)
}
