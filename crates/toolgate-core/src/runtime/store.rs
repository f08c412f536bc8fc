// crates/toolgate-core/src/runtime/store.rs
// ============================================================================
// Module: In-Memory Audit Store
// Description: Process-local AuditStore for tests and ephemeral deployments.
// Purpose: Provide the reference append/query semantics without durability.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The in-memory store keeps records in append order behind a lock and
//! serves filtered queries newest first. It implements the same contract as
//! the durable store, minus durability, and is the store of choice for unit
//! tests and single-shot tooling.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use crate::core::record::AuditQuery;
use crate::core::record::AuditRecord;
use crate::interfaces::AuditStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Volatile, append-ordered audit store.
///
/// # Invariants
/// - Records are appended in completion order and never mutated.
#[derive(Default)]
pub struct InMemoryAuditStore {
    /// Records in append order.
    records: Mutex<Vec<AuditRecord>>,
}

impl InMemoryAuditStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the lock is poisoned.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }

    /// Returns true when no records are stored.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] when the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.lock()?.is_empty())
    }

    /// Locks the record vector.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<AuditRecord>>, StoreError> {
        self.records.lock().map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }
}

impl AuditStore for InMemoryAuditStore {
    fn append(&self, record: &AuditRecord) -> Result<(), StoreError> {
        self.lock()?.push(record.clone());
        Ok(())
    }

    fn query(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>, StoreError> {
        let records = self.lock()?;
        let mut matched: Vec<AuditRecord> =
            records.iter().rev().filter(|record| query.matches(record)).cloned().collect();
        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }
}
