// crates/toolgate-store-sqlite/src/lib.rs
// ============================================================================
// Module: Toolgate SQLite Store Library
// Description: Public API surface for the SQLite audit store.
// Purpose: Expose the durable AuditStore implementation and its config.
// Dependencies: crate::store
// ============================================================================

//! ## Overview
//! Durable [`toolgate_core::AuditStore`] implementation backed by `SQLite`.
//! Records append in completion order; filtered queries return newest first
//! over dedicated indexes for identity, operation name, and outcome.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::DEFAULT_QUERY_LIMIT;
pub use store::MAX_QUERY_LIMIT;
pub use store::SqliteAuditStore;
pub use store::SqliteJournalMode;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteSyncMode;
