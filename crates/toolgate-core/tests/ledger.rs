// crates/toolgate-core/tests/ledger.rs
// ============================================================================
// Module: Audit Ledger Tests
// Description: Tests for append, redaction, digests, queries, and alerts.
// Purpose: Validate the ledger records gated calls exactly once, safely.
// ============================================================================

//! ## Overview
//! Validates that appended records carry redacted parameters and a matching
//! integrity digest, that tampering any stored field fails verification,
//! that queries filter newest first, and that a failing store escalates
//! through the alert sink instead of propagating.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;

use serde_json::json;
use toolgate_core::AlertEvent;
use toolgate_core::AlertSink;
use toolgate_core::AppendParams;
use toolgate_core::AuditLedger;
use toolgate_core::AuditOutcome;
use toolgate_core::AuditQuery;
use toolgate_core::AuditRecord;
use toolgate_core::AuditStore;
use toolgate_core::CallerId;
use toolgate_core::Clock;
use toolgate_core::ErrorSanitizer;
use toolgate_core::InMemoryAuditStore;
use toolgate_core::NoopAlertSink;
use toolgate_core::StoreError;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Manually advanced clock for deterministic record timestamps.
struct ManualClock {
    /// Current time in unix milliseconds.
    now_ms: AtomicI64,
}

impl ManualClock {
    /// Creates a clock at the provided instant.
    fn new(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    /// Advances the clock by the provided amount.
    fn advance(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix_millis(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Store that rejects every write, for the alert escalation path.
struct FailingStore;

impl AuditStore for FailingStore {
    fn append(&self, _record: &AuditRecord) -> Result<(), StoreError> {
        Err(StoreError::Backend("disk full".to_string()))
    }

    fn query(&self, _query: &AuditQuery) -> Result<Vec<AuditRecord>, StoreError> {
        Ok(Vec::new())
    }
}

/// Alert sink that captures notifications for assertions.
#[derive(Default)]
struct CapturingAlertSink {
    /// Captured alert events.
    events: Mutex<Vec<AlertEvent>>,
}

impl AlertSink for CapturingAlertSink {
    fn notify(&self, event: &AlertEvent) {
        self.events.lock().expect("alert lock").push(event.clone());
    }
}

/// Builds a ledger over the provided store and alert sink.
fn ledger_over(
    store: Arc<dyn AuditStore>,
    alerts: Arc<dyn AlertSink>,
) -> (AuditLedger, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let sanitizer = Arc::new(ErrorSanitizer::new().expect("sanitizer must compile"));
    let ledger = AuditLedger::new(store, alerts, sanitizer, clock.clone());
    (ledger, clock)
}

/// Appends one successful record for the provided caller and operation.
fn append_success(ledger: &AuditLedger, caller: &str, operation: &str) {
    ledger.append(AppendParams {
        identity: CallerId::new(caller),
        operation_name: operation.to_string(),
        raw_parameters: json!({"path": "src/main.rs"}),
        outcome: AuditOutcome::Success,
        duration_ms: 12,
        error_text: None,
        correlation_id: None,
    });
}

// ============================================================================
// SECTION: Append Tests
// ============================================================================

#[test]
fn append_persists_a_redacted_digested_record() {
    let store = Arc::new(InMemoryAuditStore::new());
    let (ledger, _clock) = ledger_over(store.clone(), Arc::new(NoopAlertSink));
    ledger.append(AppendParams {
        identity: CallerId::new("caller-a"),
        operation_name: "sandbox.write_file".to_string(),
        raw_parameters: json!({"path": "src/main.rs", "github_token": "ghp_deadbeef"}),
        outcome: AuditOutcome::Success,
        duration_ms: 42,
        error_text: None,
        correlation_id: Some("req-1".to_string()),
    });

    let records = store.query(&AuditQuery::default()).expect("query");
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.identity, CallerId::new("caller-a"));
    assert_eq!(record.operation_name, "sandbox.write_file");
    assert_eq!(record.parameters["github_token"], json!("[REDACTED]"));
    assert_eq!(record.parameters["path"], json!("src/main.rs"));
    assert_eq!(record.duration_ms, 42);
    assert_eq!(record.correlation_id.as_deref(), Some("req-1"));
    assert!(record.timestamp.starts_with("2023-11-14T"));
    assert!(record.digest_matches());
}

#[test]
fn append_sanitizes_error_text() {
    let store = Arc::new(InMemoryAuditStore::new());
    let (ledger, _clock) = ledger_over(store.clone(), Arc::new(NoopAlertSink));
    ledger.append(AppendParams {
        identity: CallerId::new("caller-a"),
        operation_name: "repo.push".to_string(),
        raw_parameters: json!({}),
        outcome: AuditOutcome::Failure,
        duration_ms: 7,
        error_text: Some("push failed with token ghp_deadbeef".to_string()),
        correlation_id: None,
    });

    let records = store.query(&AuditQuery::default()).expect("query");
    let error = records[0].error.as_deref().expect("error text");
    assert!(error.contains("[REDACTED]"));
    assert!(!error.contains("ghp_deadbeef"));
    assert!(records[0].digest_matches());
}

// ============================================================================
// SECTION: Verification Tests
// ============================================================================

#[test]
fn verify_accepts_unaltered_records() {
    let store = Arc::new(InMemoryAuditStore::new());
    let (ledger, _clock) = ledger_over(store.clone(), Arc::new(NoopAlertSink));
    append_success(&ledger, "caller-a", "sandbox.run");
    append_success(&ledger, "caller-b", "repo.clone");

    let records = store.query(&AuditQuery::default()).expect("query");
    assert!(AuditLedger::verify(&records));
}

#[test]
fn verify_rejects_any_tampered_field() {
    let store = Arc::new(InMemoryAuditStore::new());
    let (ledger, _clock) = ledger_over(store.clone(), Arc::new(NoopAlertSink));
    append_success(&ledger, "caller-a", "sandbox.run");
    let records = store.query(&AuditQuery::default()).expect("query");

    let mut tampered = records.clone();
    tampered[0].identity = CallerId::new("caller-z");
    assert!(!AuditLedger::verify(&tampered));

    let mut tampered = records.clone();
    tampered[0].duration_ms += 1;
    assert!(!AuditLedger::verify(&tampered));

    let mut tampered = records.clone();
    tampered[0].parameters = json!({"path": "elsewhere"});
    assert!(!AuditLedger::verify(&tampered));

    let mut tampered = records;
    tampered[0].outcome = AuditOutcome::Failure;
    assert!(!AuditLedger::verify(&tampered));
}

// ============================================================================
// SECTION: Query Tests
// ============================================================================

#[test]
fn query_filters_and_orders_newest_first() {
    let store = Arc::new(InMemoryAuditStore::new());
    let (ledger, clock) = ledger_over(store.clone(), Arc::new(NoopAlertSink));
    append_success(&ledger, "caller-a", "sandbox.run");
    clock.advance(1_000);
    append_success(&ledger, "caller-b", "repo.clone");
    clock.advance(1_000);
    append_success(&ledger, "caller-a", "repo.clone");

    let all = ledger.query(&AuditQuery::default()).expect("query");
    assert_eq!(all.len(), 3);
    assert!(all[0].timestamp_ms >= all[1].timestamp_ms);
    assert!(all[1].timestamp_ms >= all[2].timestamp_ms);

    let by_identity = ledger
        .query(&AuditQuery {
            identity: Some(CallerId::new("caller-a")),
            ..AuditQuery::default()
        })
        .expect("query");
    assert_eq!(by_identity.len(), 2);

    let by_operation = ledger
        .query(&AuditQuery {
            operation_name: Some("repo.clone".to_string()),
            ..AuditQuery::default()
        })
        .expect("query");
    assert_eq!(by_operation.len(), 2);

    let limited = ledger
        .query(&AuditQuery {
            limit: Some(1),
            ..AuditQuery::default()
        })
        .expect("query");
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].identity, CallerId::new("caller-a"));
    assert_eq!(limited[0].operation_name, "repo.clone");
}

#[test]
fn query_filters_by_time_range_and_outcome() {
    let store = Arc::new(InMemoryAuditStore::new());
    let (ledger, clock) = ledger_over(store.clone(), Arc::new(NoopAlertSink));
    let start_ms = 1_700_000_000_000;
    append_success(&ledger, "caller-a", "sandbox.run");
    clock.advance(5_000);
    ledger.append(AppendParams {
        identity: CallerId::new("caller-a"),
        operation_name: "sandbox.run".to_string(),
        raw_parameters: json!({}),
        outcome: AuditOutcome::Throttled,
        duration_ms: 0,
        error_text: Some("rate limit exceeded".to_string()),
        correlation_id: None,
    });

    let recent = ledger
        .query(&AuditQuery {
            since_ms: Some(start_ms + 1_000),
            ..AuditQuery::default()
        })
        .expect("query");
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].outcome, AuditOutcome::Throttled);

    let early = ledger
        .query(&AuditQuery {
            until_ms: Some(start_ms + 1_000),
            ..AuditQuery::default()
        })
        .expect("query");
    assert_eq!(early.len(), 1);
    assert_eq!(early[0].outcome, AuditOutcome::Success);

    let throttled = ledger
        .query(&AuditQuery {
            outcome: Some(AuditOutcome::Throttled),
            ..AuditQuery::default()
        })
        .expect("query");
    assert_eq!(throttled.len(), 1);
}

// ============================================================================
// SECTION: Alert Escalation Tests
// ============================================================================

#[test]
fn store_failure_escalates_without_propagating() {
    let alerts = Arc::new(CapturingAlertSink::default());
    let (ledger, _clock) = ledger_over(Arc::new(FailingStore), alerts.clone());
    // The gated call's audit write fails; append still returns normally.
    append_success(&ledger, "caller-a", "sandbox.run");

    let events = alerts.events.lock().expect("alert lock");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, "audit_persistence_alert");
    assert_eq!(events[0].context, "sandbox.run");
    assert!(events[0].message.contains("disk full"));
}

#[test]
fn healthy_store_raises_no_alerts() {
    let alerts = Arc::new(CapturingAlertSink::default());
    let store = Arc::new(InMemoryAuditStore::new());
    let (ledger, _clock) = ledger_over(store, alerts.clone());
    append_success(&ledger, "caller-a", "sandbox.run");
    assert!(alerts.events.lock().expect("alert lock").is_empty());
}
