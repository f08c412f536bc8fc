// crates/toolgate-core/src/runtime/sanitize/tests.rs
// ============================================================================
// Module: Error Sanitization Tests
// Description: Unit tests for the message and parameter redaction pipeline.
// Purpose: Validate ordering, redaction coverage, and idempotence.
// Dependencies: toolgate-core
// ============================================================================

//! ## Overview
//! Validates that the message pipeline truncates first and never leaks
//! credential values, home paths, or long opaque runs, and that parameter
//! redaction replaces only sensitive-keyed values at any nesting depth.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::json;

use super::ErrorSanitizer;
use super::HOME_PLACEHOLDER;
use super::MAX_MESSAGE_LENGTH;
use super::REDACTION_MARKER;
use super::TRUNCATION_MARKER;

/// Builds a sanitizer, failing the test when patterns do not compile.
fn sanitizer() -> ErrorSanitizer {
    ErrorSanitizer::new().expect("sanitizer patterns must compile")
}

// ============================================================================
// SECTION: Message Pipeline Tests
// ============================================================================

#[test]
fn message_redacts_token_with_value() {
    let out = sanitizer().sanitize_message("Failed with token abc123xyz");
    assert!(out.contains(REDACTION_MARKER));
    assert!(!out.contains("abc123xyz"));
}

#[test]
fn message_redacts_separator_forms() {
    let sanitizer = sanitizer();
    for raw in [
        "api_key=sk_live_4242",
        "api-key: sk_live_4242",
        "password=hunter2x",
        "secret hunter2x",
    ] {
        let out = sanitizer.sanitize_message(raw);
        assert!(out.contains(REDACTION_MARKER), "no marker for {raw}");
        assert!(!out.contains("sk_live_4242"), "value leaked for {raw}");
        assert!(!out.contains("hunter2x"), "value leaked for {raw}");
    }
}

#[test]
fn message_redacts_bare_sensitive_words() {
    let out = sanitizer().sanitize_message("invalid token");
    assert!(out.contains(REDACTION_MARKER));
    assert!(!out.to_lowercase().contains("token"));
}

#[test]
fn message_replaces_home_directories() {
    let sanitizer = sanitizer();
    let unix = sanitizer.sanitize_message("read /home/alice/workspace/file failed");
    assert!(unix.contains(HOME_PLACEHOLDER));
    assert!(!unix.contains("alice"));
    let mac = sanitizer.sanitize_message("read /Users/alice/workspace/file failed");
    assert!(mac.contains(HOME_PLACEHOLDER));
    assert!(!mac.contains("alice"));
    let windows = sanitizer.sanitize_message(r"read C:\Users\alice\workspace failed");
    assert!(windows.contains(HOME_PLACEHOLDER));
    assert!(!windows.contains("alice"));
}

#[test]
fn message_redacts_long_opaque_runs() {
    let out = sanitizer().sanitize_message("upstream id eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9 seen");
    assert!(out.contains(REDACTION_MARKER));
    assert!(!out.contains("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9"));
}

#[test]
fn message_truncates_before_substitution() {
    let raw = "x".repeat(MAX_MESSAGE_LENGTH + 100);
    let out = sanitizer().sanitize_message(&raw);
    assert!(out.contains(TRUNCATION_MARKER));
    // The tail beyond the cap never reaches the later pipeline steps.
    assert!(out.chars().count() < raw.chars().count());
}

#[test]
fn message_short_input_is_not_truncated() {
    let out = sanitizer().sanitize_message("plain failure");
    assert_eq!(out, "plain failure");
}

// ============================================================================
// SECTION: Parameter Pipeline Tests
// ============================================================================

#[test]
fn parameters_redact_sensitive_keys_only() {
    let raw = json!({
        "path": "src/index.ts",
        "apiKey": "sk_live_4242",
        "github_token": "ghp_deadbeef",
        "timeout_ms": 3000,
    });
    let out = sanitizer().redact_parameters(&raw);
    assert_eq!(out["path"], json!("src/index.ts"));
    assert_eq!(out["apiKey"], json!(REDACTION_MARKER));
    assert_eq!(out["github_token"], json!(REDACTION_MARKER));
    assert_eq!(out["timeout_ms"], json!(3000));
}

#[test]
fn parameters_redact_at_any_depth() {
    let raw = json!({
        "config": {
            "auth": {"password": "hunter2"},
            "region": "us-east-1",
            "nested": {"deeper": {"SECRET_VALUE": "s3cr3t"}},
        },
    });
    let out = sanitizer().redact_parameters(&raw);
    assert_eq!(out["config"]["auth"], json!(REDACTION_MARKER));
    assert_eq!(out["config"]["region"], json!("us-east-1"));
    assert_eq!(out["config"]["nested"]["deeper"]["SECRET_VALUE"], json!(REDACTION_MARKER));
}

#[test]
fn parameters_recurse_into_arrays() {
    let raw = json!({
        "steps": [
            {"run": "build", "token": "ghp_deadbeef"},
            {"run": "test"},
        ],
    });
    let out = sanitizer().redact_parameters(&raw);
    assert_eq!(out["steps"][0]["token"], json!(REDACTION_MARKER));
    assert_eq!(out["steps"][0]["run"], json!("build"));
    assert_eq!(out["steps"][1]["run"], json!("test"));
}

#[test]
fn parameters_pass_scalars_and_arrays_through() {
    let raw = json!({"names": ["a", "b"], "count": 2, "flag": true, "none": null});
    let out = sanitizer().redact_parameters(&raw);
    assert_eq!(out, raw);
}

#[test]
fn parameter_redaction_is_idempotent() {
    let raw = json!({
        "apiKey": "sk_live_4242",
        "nested": {"auth_header": "Bearer xyz", "plain": "keep"},
    });
    let sanitizer = sanitizer();
    let once = sanitizer.redact_parameters(&raw);
    let twice = sanitizer.redact_parameters(&once);
    assert_eq!(once, twice);
}
