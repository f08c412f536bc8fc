// crates/toolgate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Toolgate Interfaces
// Description: Backend-agnostic seams for storage, alerting, and time.
// Purpose: Define the contract surfaces used by the Toolgate runtime.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! Interfaces define how the guard layer integrates with storage and operator
//! channels without embedding backend-specific details. Implementations must
//! be deterministic and fail closed on missing or invalid data. The
//! [`AlertSink`] is deliberately independent of the [`AuditStore`]: it is the
//! escalation path used precisely when the store has failed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;

use crate::core::record::AuditQuery;
use crate::core::record::AuditRecord;
use crate::core::time::unix_millis_now;

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Errors surfaced by audit store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying storage backend failure.
    #[error("audit store backend error: {0}")]
    Backend(String),
    /// Invalid stored data or invalid request shape.
    #[error("audit store invalid: {0}")]
    Invalid(String),
    /// Record serialization or deserialization failure.
    #[error("audit store serialization error: {0}")]
    Serialization(String),
}

// ============================================================================
// SECTION: Audit Store
// ============================================================================

/// Append-only persistence for audit records.
///
/// # Invariants
/// - Appends are durable and ordered at least per identity.
/// - Stored records are never mutated or deleted through this interface.
pub trait AuditStore: Send + Sync {
    /// Persists one completed record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails; the ledger escalates the
    /// failure through its alert sink rather than propagating it.
    fn append(&self, record: &AuditRecord) -> Result<(), StoreError>;

    /// Returns records matching the filter set, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails or stored data is invalid.
    fn query(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>, StoreError>;
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Wall-clock seam for window arithmetic and record timestamps.
pub trait Clock: Send + Sync {
    /// Returns the current unix epoch in milliseconds.
    fn now_unix_millis(&self) -> i64;
}

/// System clock reading process wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix_millis(&self) -> i64 {
        unix_millis_now()
    }
}

// ============================================================================
// SECTION: Alert Sink
// ============================================================================

/// Operator alert emitted when the ledger cannot persist a record.
#[derive(Debug, Clone, Serialize)]
pub struct AlertEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: i64,
    /// Component or operation that raised the alert.
    pub context: String,
    /// Sanitized failure detail.
    pub message: String,
}

impl AlertEvent {
    /// Creates a new alert event with a consistent timestamp.
    #[must_use]
    pub fn new(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            event: "audit_persistence_alert",
            timestamp_ms: unix_millis_now(),
            context: context.into(),
            message: message.into(),
        }
    }
}

/// Emergency notification channel independent of the audit store.
pub trait AlertSink: Send + Sync {
    /// Emits an alert event to the operator channel.
    fn notify(&self, event: &AlertEvent);
}

/// Alert sink that logs JSON lines to stderr.
pub struct StderrAlertSink;

impl AlertSink for StderrAlertSink {
    fn notify(&self, event: &AlertEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Alert sink that logs JSON lines to a file.
pub struct FileAlertSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAlertSink {
    /// Opens the alert log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AlertSink for FileAlertSink {
    fn notify(&self, event: &AlertEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op alert sink.
pub struct NoopAlertSink;

impl AlertSink for NoopAlertSink {
    fn notify(&self, _event: &AlertEvent) {}
}
