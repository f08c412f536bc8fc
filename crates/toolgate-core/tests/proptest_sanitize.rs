// crates/toolgate-core/tests/proptest_sanitize.rs
// ============================================================================
// Module: Sanitizer Property-Based Tests
// Description: Property tests for redaction coverage and stability.
// Purpose: Detect leaks and panics across wide input ranges.
// ============================================================================

//! Property-based tests for sanitizer invariants.

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
    reason = "Test-only assertions and helpers are permitted."
)]

use proptest::prelude::*;
use serde_json::Value;
use serde_json::json;
use toolgate_core::ErrorSanitizer;
use toolgate_core::runtime::sanitize::MAX_MESSAGE_LENGTH;
use toolgate_core::runtime::sanitize::TRUNCATION_MARKER;

/// Builds a sanitizer, panicking only on pattern compilation failure.
fn sanitizer() -> ErrorSanitizer {
    ErrorSanitizer::new().expect("sanitizer patterns must compile")
}

/// Strategy producing secret-looking values the pipeline must remove.
fn secret_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9]{24,40}"
}

proptest! {
    #[test]
    fn seeded_secret_never_survives_message_pipeline(
        secret in secret_strategy(),
        prefix in "[a-z ]{0,40}",
    ) {
        let raw = format!("{prefix} token {secret}");
        let out = sanitizer().sanitize_message(&raw);
        prop_assert!(!out.contains(&secret));
    }

    #[test]
    fn long_opaque_runs_never_survive(secret in secret_strategy()) {
        let raw = format!("failure handling id {secret} mid-flight");
        let out = sanitizer().sanitize_message(&raw);
        prop_assert!(!out.contains(&secret));
    }

    #[test]
    fn sanitize_message_never_panics_and_bounds_growth(raw in ".{0,2048}") {
        let out = sanitizer().sanitize_message(&raw);
        // Truncation runs first, so output length is bounded by the cap plus
        // marker growth from substitutions over the bounded string.
        if raw.chars().count() > MAX_MESSAGE_LENGTH {
            prop_assert!(out.contains(TRUNCATION_MARKER));
        }
    }

    #[test]
    fn sensitive_keys_are_always_redacted(secret in secret_strategy()) {
        let raw = json!({
            "apiKey": secret,
            "nested": {"auth_token": secret, "plain": "keep"},
            "list": [{"password": secret}],
        });
        let out = sanitizer().redact_parameters(&raw);
        let rendered = out.to_string();
        prop_assert!(!rendered.contains(&secret));
        prop_assert_eq!(out["nested"]["plain"].clone(), Value::String("keep".to_string()));
    }

    #[test]
    fn parameter_redaction_is_a_fixpoint(secret in secret_strategy()) {
        let raw = json!({
            "github_token": secret,
            "config": {"region": "us-east-1", "client_secret": secret},
        });
        let sanitizer = sanitizer();
        let once = sanitizer.redact_parameters(&raw);
        let twice = sanitizer.redact_parameters(&once);
        prop_assert_eq!(once, twice);
    }
}
