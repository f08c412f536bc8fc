// crates/toolgate-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Audit Store
// Description: Durable AuditStore backed by SQLite WAL.
// Purpose: Persist audit records append-only with indexed filtered queries.
// Dependencies: toolgate-core, rusqlite, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`AuditStore`] using `SQLite`. Records
//! are inserted append-only; the monotonic rowid is the ordering key and
//! queries return newest first. Database contents are treated as untrusted
//! on the way back out: outcome labels, hash algorithm labels, and parameter
//! JSON are re-validated and fail closed on corruption.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use rusqlite::params_from_iter;
use serde::Deserialize;
use thiserror::Error;
use toolgate_core::AuditOutcome;
use toolgate_core::AuditQuery;
use toolgate_core::AuditRecord;
use toolgate_core::AuditStore;
use toolgate_core::CallerId;
use toolgate_core::HashAlgorithm;
use toolgate_core::HashDigest;
use toolgate_core::StoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default maximum records returned by a query.
pub const DEFAULT_QUERY_LIMIT: usize = 100;
/// Maximum records returned by a query.
pub const MAX_QUERY_LIMIT: usize = 1_000;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` audit store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a config with defaults for the provided path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` audit store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Underlying `SQLite` error.
    #[error("sqlite error: {0}")]
    Db(String),
    /// Invalid configuration, request, or stored data.
    #[error("sqlite store invalid: {0}")]
    Invalid(String),
    /// Incompatible on-disk schema version.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Db(message) => Self::Backend(message),
            SqliteStoreError::Invalid(message) | SqliteStoreError::VersionMismatch(message) => {
                Self::Invalid(message)
            }
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Durable, append-only audit store backed by `SQLite`.
///
/// # Invariants
/// - Appends and reads are serialized through one mutex-guarded connection,
///   so completion order is preserved globally.
/// - Stored rows are never updated or deleted through this interface.
pub struct SqliteAuditStore {
    /// Shared `SQLite` connection.
    connection: Mutex<Connection>,
}

impl SqliteAuditStore {
    /// Opens (or creates) the audit database at the configured path.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path is invalid, the database
    /// cannot be opened, or the on-disk schema version is unsupported.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Locks the connection, failing closed on poisoning.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Inserts one record row.
    fn insert_record(&self, record: &AuditRecord) -> Result<(), SqliteStoreError> {
        let parameters = serde_json::to_vec(&record.parameters)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let connection = self.lock()?;
        connection
            .execute(
                "INSERT INTO audit_records (timestamp, timestamp_ms, identity, operation_name, \
                 parameters, outcome, error, correlation_id, duration_ms, integrity_digest, \
                 hash_algorithm) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.timestamp,
                    record.timestamp_ms,
                    record.identity.as_str(),
                    record.operation_name,
                    parameters,
                    record.outcome.as_str(),
                    record.error,
                    record.correlation_id,
                    i64::try_from(record.duration_ms).unwrap_or(i64::MAX),
                    record.digest.value,
                    record.digest.algorithm.as_str(),
                ],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// Fetches rows matching the filter set, newest first.
    fn fetch_records(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>, SqliteStoreError> {
        let limit = normalize_limit(query.limit)?;
        let mut clauses: Vec<&'static str> = Vec::new();
        let mut bindings: Vec<rusqlite::types::Value> = Vec::new();
        if let Some(identity) = &query.identity {
            clauses.push("identity = ?");
            bindings.push(identity.as_str().to_string().into());
        }
        if let Some(operation_name) = &query.operation_name {
            clauses.push("operation_name = ?");
            bindings.push(operation_name.clone().into());
        }
        if let Some(outcome) = query.outcome {
            clauses.push("outcome = ?");
            bindings.push(outcome.as_str().to_string().into());
        }
        if let Some(since_ms) = query.since_ms {
            clauses.push("timestamp_ms >= ?");
            bindings.push(since_ms.into());
        }
        if let Some(until_ms) = query.until_ms {
            clauses.push("timestamp_ms <= ?");
            bindings.push(until_ms.into());
        }
        let filter = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT timestamp, timestamp_ms, identity, operation_name, parameters, outcome, \
             error, correlation_id, duration_ms, integrity_digest, hash_algorithm FROM \
             audit_records{filter} ORDER BY id DESC LIMIT ?"
        );
        bindings.push(i64::try_from(limit).unwrap_or(i64::MAX).into());

        let connection = self.lock()?;
        let mut statement =
            connection.prepare(&sql).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let rows = statement
            .query_map(params_from_iter(bindings), |row| {
                Ok(RawRecordRow {
                    timestamp: row.get(0)?,
                    timestamp_ms: row.get(1)?,
                    identity: row.get(2)?,
                    operation_name: row.get(3)?,
                    parameters: row.get(4)?,
                    outcome: row.get(5)?,
                    error: row.get(6)?,
                    correlation_id: row.get(7)?,
                    duration_ms: row.get(8)?,
                    integrity_digest: row.get(9)?,
                    hash_algorithm: row.get(10)?,
                })
            })
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let mut records = Vec::new();
        for row in rows {
            let row = row.map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            records.push(row.into_record()?);
        }
        Ok(records)
    }
}

impl AuditStore for SqliteAuditStore {
    fn append(&self, record: &AuditRecord) -> Result<(), StoreError> {
        self.insert_record(record).map_err(StoreError::from)
    }

    fn query(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>, StoreError> {
        self.fetch_records(query).map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Raw column values for one stored record.
struct RawRecordRow {
    /// Completion timestamp, RFC 3339 UTC.
    timestamp: String,
    /// Derived unix epoch milliseconds.
    timestamp_ms: i64,
    /// Caller identity.
    identity: String,
    /// Gated operation name.
    operation_name: String,
    /// Redacted parameter JSON bytes.
    parameters: Vec<u8>,
    /// Outcome label.
    outcome: String,
    /// Sanitized error text when present.
    error: Option<String>,
    /// Caller correlation identifier when present.
    correlation_id: Option<String>,
    /// Measured downstream duration in milliseconds.
    duration_ms: i64,
    /// Stored digest hex value.
    integrity_digest: String,
    /// Stored hash algorithm label.
    hash_algorithm: String,
}

impl RawRecordRow {
    /// Re-validates raw columns into an [`AuditRecord`], failing closed.
    fn into_record(self) -> Result<AuditRecord, SqliteStoreError> {
        let parameters = serde_json::from_slice(&self.parameters)
            .map_err(|err| SqliteStoreError::Invalid(format!("stored parameters invalid: {err}")))?;
        let outcome = AuditOutcome::parse(&self.outcome)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let algorithm = HashAlgorithm::parse(&self.hash_algorithm)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let duration_ms = u64::try_from(self.duration_ms)
            .map_err(|_| SqliteStoreError::Invalid("stored duration negative".to_string()))?;
        Ok(AuditRecord {
            timestamp: self.timestamp,
            timestamp_ms: self.timestamp_ms,
            identity: CallerId::new(self.identity),
            operation_name: self.operation_name,
            parameters,
            outcome,
            error: self.error,
            correlation_id: self.correlation_id,
            duration_ms,
            digest: HashDigest {
                algorithm,
                value: self.integrity_digest,
            },
        })
    }
}

// ============================================================================
// SECTION: Connection Setup
// ============================================================================

/// Validates the configured database path.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS audit_records (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    timestamp TEXT NOT NULL,
                    timestamp_ms INTEGER NOT NULL,
                    identity TEXT NOT NULL,
                    operation_name TEXT NOT NULL,
                    parameters BLOB NOT NULL,
                    outcome TEXT NOT NULL,
                    error TEXT,
                    correlation_id TEXT,
                    duration_ms INTEGER NOT NULL,
                    integrity_digest TEXT NOT NULL,
                    hash_algorithm TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_audit_records_identity
                    ON audit_records (identity, timestamp_ms);
                CREATE INDEX IF NOT EXISTS idx_audit_records_operation
                    ON audit_records (operation_name, timestamp_ms);
                CREATE INDEX IF NOT EXISTS idx_audit_records_outcome
                    ON audit_records (outcome, timestamp_ms);",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Normalizes query limits against configured defaults and bounds.
fn normalize_limit(limit: Option<usize>) -> Result<usize, SqliteStoreError> {
    let limit = limit.unwrap_or(DEFAULT_QUERY_LIMIT);
    if limit == 0 || limit > MAX_QUERY_LIMIT {
        return Err(SqliteStoreError::Invalid(format!(
            "limit must be between 1 and {MAX_QUERY_LIMIT}"
        )));
    }
    Ok(limit)
}
