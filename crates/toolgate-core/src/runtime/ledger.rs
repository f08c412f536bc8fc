// crates/toolgate-core/src/runtime/ledger.rs
// ============================================================================
// Module: Audit Ledger
// Description: Append-only, tamper-evident recording of every gated call.
// Purpose: Persist redacted, digested records without failing gated calls.
// Dependencies: crate::core, crate::interfaces, crate::runtime::sanitize
// ============================================================================

//! ## Overview
//! The ledger records each gated call exactly once, at completion, with
//! parameters redacted before persistence and a per-record integrity digest
//! computed over the canonical field set. Persistence failures never
//! propagate to the gated call; they escalate through the [`AlertSink`],
//! a channel independent of the ledger itself, because silently crashing the
//! call and silently losing the record are both unacceptable.
//!
//! The digest is per-record only, not chained to the previous record. It
//! detects in-place modification of a still-present record; deletion or
//! reordering of the sequence is outside its reach. A crash between a gated
//! operation's completion and its ledger write loses exactly that one
//! record.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::identifiers::CallerId;
use crate::core::record::AuditOutcome;
use crate::core::record::AuditQuery;
use crate::core::record::AuditRecord;
use crate::core::time::rfc3339_from_unix_millis;
use crate::interfaces::AlertEvent;
use crate::interfaces::AlertSink;
use crate::interfaces::AuditStore;
use crate::interfaces::Clock;
use crate::interfaces::StoreError;
use crate::runtime::sanitize::ErrorSanitizer;

// ============================================================================
// SECTION: Append Parameters
// ============================================================================

/// Inputs required to record one completed gated call.
pub struct AppendParams {
    /// Caller identity the call was gated for.
    pub identity: CallerId,
    /// Gated operation name.
    pub operation_name: String,
    /// Raw parameter map; redacted by the ledger before persistence.
    pub raw_parameters: Value,
    /// Outcome of the gated call.
    pub outcome: AuditOutcome,
    /// Measured downstream duration in milliseconds.
    pub duration_ms: u64,
    /// Error text when the outcome was not a success; sanitized by the
    /// ledger.
    pub error_text: Option<String>,
    /// Caller correlation identifier when provided.
    pub correlation_id: Option<String>,
}

// ============================================================================
// SECTION: Audit Ledger
// ============================================================================

/// Append-only ledger over a pluggable store and alert channel.
///
/// # Invariants
/// - Records are created once per gated call and never mutated afterwards.
/// - `append` never propagates a persistence failure to the caller.
pub struct AuditLedger {
    /// Durable record store.
    store: Arc<dyn AuditStore>,
    /// Emergency operator channel for persistence failures.
    alerts: Arc<dyn AlertSink>,
    /// Shared redaction pipeline.
    sanitizer: Arc<ErrorSanitizer>,
    /// Wall-clock seam.
    clock: Arc<dyn Clock>,
}

impl AuditLedger {
    /// Creates a ledger over a store, alert sink, sanitizer, and clock.
    #[must_use]
    pub fn new(
        store: Arc<dyn AuditStore>,
        alerts: Arc<dyn AlertSink>,
        sanitizer: Arc<ErrorSanitizer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            alerts,
            sanitizer,
            clock,
        }
    }

    /// Records one completed gated call.
    ///
    /// Redacts parameters, sanitizes any error text, stamps the completion
    /// timestamp, computes the integrity digest, and writes through the
    /// store. A failure anywhere on that path raises an operator alert and
    /// returns normally; the gated call must not be aborted by its own audit
    /// trail.
    pub fn append(&self, params: AppendParams) {
        let now_ms = self.clock.now_unix_millis();
        let timestamp = match rfc3339_from_unix_millis(now_ms) {
            Ok(timestamp) => timestamp,
            Err(err) => {
                self.alert(&params.operation_name, &format!("timestamp unavailable: {err}"));
                return;
            }
        };
        let mut record = AuditRecord {
            timestamp,
            timestamp_ms: now_ms,
            identity: params.identity,
            operation_name: params.operation_name,
            parameters: self.sanitizer.redact_parameters(&params.raw_parameters),
            outcome: params.outcome,
            error: params.error_text.map(|text| self.sanitizer.sanitize_message(&text)),
            correlation_id: params.correlation_id,
            duration_ms: params.duration_ms,
            digest: HashDigest {
                algorithm: DEFAULT_HASH_ALGORITHM,
                value: String::new(),
            },
        };
        match record.compute_digest() {
            Ok(digest) => record.digest = digest,
            Err(err) => {
                self.alert(&record.operation_name, &format!("digest unavailable: {err}"));
                return;
            }
        }
        if let Err(err) = self.store.append(&record) {
            self.alert(&record.operation_name, &err.to_string());
        }
    }

    /// Returns records matching the filter set, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the underlying read fails.
    pub fn query(&self, query: &AuditQuery) -> Result<Vec<AuditRecord>, StoreError> {
        self.store.query(query)
    }

    /// Verifies the integrity digest of every record in the set.
    ///
    /// Returns false when any record's stored fields no longer match its
    /// stored digest. Deleted or reordered records are not detectable from
    /// the per-record digest alone.
    #[must_use]
    pub fn verify(records: &[AuditRecord]) -> bool {
        records.iter().all(AuditRecord::digest_matches)
    }

    /// Emits a sanitized operator alert through the emergency channel.
    fn alert(&self, context: &str, detail: &str) {
        let event = AlertEvent::new(context, self.sanitizer.sanitize_message(detail));
        self.alerts.notify(&event);
    }
}
