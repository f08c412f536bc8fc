// crates/toolgate-core/src/core/record.rs
// ============================================================================
// Module: Toolgate Audit Record Model
// Description: Immutable audit record tuple, outcomes, and query filters.
// Purpose: Define the persisted shape of every gated call exactly once.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! One [`AuditRecord`] is created per gated call, at completion, and is never
//! updated or deleted through the ledger interface. Parameters are stored
//! redacted; the integrity digest covers a canonical serialization of the
//! record's own fields and is deliberately per-record only — it detects
//! in-place modification of a still-present record but not deletion or
//! reordering of the sequence.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::CallerId;

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Outcome recorded for every gated call.
///
/// # Invariants
/// - Variants are stable for persisted records and filtered queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// Downstream operation completed successfully.
    Success,
    /// Downstream operation failed.
    Failure,
    /// Call was rejected by the rate limiter before dispatch.
    Throttled,
}

impl AuditOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Throttled => "throttled",
        }
    }

    /// Parses a stored outcome label.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::UnknownOutcome`] for unrecognized labels.
    pub fn parse(label: &str) -> Result<Self, RecordError> {
        match label {
            "success" => Ok(Self::Success),
            "failure" => Ok(Self::Failure),
            "throttled" => Ok(Self::Throttled),
            other => Err(RecordError::UnknownOutcome(other.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when reconstructing records from storage.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Stored outcome label is not a known variant.
    #[error("unknown audit outcome: {0}")]
    UnknownOutcome(String),
}

// ============================================================================
// SECTION: Audit Record
// ============================================================================

/// Immutable record of one gated call.
///
/// # Invariants
/// - `parameters` is already redacted; raw caller parameters never persist.
/// - `timestamp` is RFC 3339 UTC; `timestamp_ms` is its derived unix-millis
///   twin used only for ordering and range filters.
/// - `digest` covers the canonical field set and never the derived twin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Completion timestamp, RFC 3339 UTC.
    pub timestamp: String,
    /// Derived unix epoch milliseconds for ordering and range filters.
    pub timestamp_ms: i64,
    /// Caller identity the call was gated for.
    pub identity: CallerId,
    /// Gated operation name.
    pub operation_name: String,
    /// Redacted parameter map as passed to the downstream operation.
    pub parameters: Value,
    /// Outcome of the gated call.
    pub outcome: AuditOutcome,
    /// Sanitized error text when the outcome was not a success.
    pub error: Option<String>,
    /// Caller correlation identifier when provided.
    pub correlation_id: Option<String>,
    /// Measured downstream duration in milliseconds.
    pub duration_ms: u64,
    /// Per-record integrity digest over the canonical field set.
    pub digest: HashDigest,
}

impl AuditRecord {
    /// Recomputes the integrity digest from the record's stored fields.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when canonical serialization fails.
    pub fn compute_digest(&self) -> Result<HashDigest, HashError> {
        hash_canonical_json(self.digest.algorithm, &self.canonical_content())
    }

    /// Returns true when the stored digest matches the recomputed one.
    ///
    /// A serialization failure counts as a mismatch; verification fails
    /// closed.
    #[must_use]
    pub fn digest_matches(&self) -> bool {
        self.compute_digest().is_ok_and(|digest| digest == self.digest)
    }

    /// Borrows the canonical field set covered by the digest.
    fn canonical_content(&self) -> CanonicalRecord<'_> {
        CanonicalRecord {
            timestamp: &self.timestamp,
            identity: self.identity.as_str(),
            operation_name: &self.operation_name,
            parameters: &self.parameters,
            outcome: self.outcome,
            error: self.error.as_deref(),
            correlation_id: self.correlation_id.as_deref(),
            duration_ms: self.duration_ms,
        }
    }
}

/// Canonical field set hashed into the integrity digest.
#[derive(Serialize)]
struct CanonicalRecord<'a> {
    /// Completion timestamp, RFC 3339 UTC.
    timestamp: &'a str,
    /// Caller identity the call was gated for.
    identity: &'a str,
    /// Gated operation name.
    operation_name: &'a str,
    /// Redacted parameter map.
    parameters: &'a Value,
    /// Outcome of the gated call.
    outcome: AuditOutcome,
    /// Sanitized error text when present.
    error: Option<&'a str>,
    /// Caller correlation identifier when present.
    correlation_id: Option<&'a str>,
    /// Measured downstream duration in milliseconds.
    duration_ms: u64,
}

// ============================================================================
// SECTION: Query Filters
// ============================================================================

/// Read-only filter set for ledger queries.
///
/// # Invariants
/// - All filters are conjunctive; `None` means unconstrained.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    /// Restrict to one caller identity.
    pub identity: Option<CallerId>,
    /// Restrict to one operation name.
    pub operation_name: Option<String>,
    /// Restrict to one outcome.
    pub outcome: Option<AuditOutcome>,
    /// Inclusive lower bound on completion time (unix millis).
    pub since_ms: Option<i64>,
    /// Inclusive upper bound on completion time (unix millis).
    pub until_ms: Option<i64>,
    /// Maximum number of records to return.
    pub limit: Option<usize>,
}

impl AuditQuery {
    /// Returns true when the record passes every set filter.
    #[must_use]
    pub fn matches(&self, record: &AuditRecord) -> bool {
        if self.identity.as_ref().is_some_and(|identity| identity != &record.identity) {
            return false;
        }
        if self.operation_name.as_deref().is_some_and(|name| name != record.operation_name) {
            return false;
        }
        if self.outcome.is_some_and(|outcome| outcome != record.outcome) {
            return false;
        }
        if self.since_ms.is_some_and(|since| record.timestamp_ms < since) {
            return false;
        }
        if self.until_ms.is_some_and(|until| record.timestamp_ms > until) {
            return false;
        }
        true
    }
}
