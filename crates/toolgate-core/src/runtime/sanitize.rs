// crates/toolgate-core/src/runtime/sanitize.rs
// ============================================================================
// Module: Error Sanitization
// Description: Message and parameter redaction pipeline.
// Purpose: Make internal errors and parameter maps safe for disclosure.
// Dependencies: regex, serde_json
// ============================================================================

//! ## Overview
//! One sanitizer instance is shared by the audit ledger (before persistence)
//! and by the gateway boundary (before returning an error to the caller), so
//! redaction is identical at both call sites. The message pipeline runs in a
//! strict order: truncation first so later substitutions operate on a bounded
//! string, then credential patterns, then bare sensitive words, then home
//! directory prefixes, then any remaining long opaque runs. The parameter
//! pipeline redacts by key name at any nesting depth and is idempotent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use regex::Regex;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::error::ErrorEnvelope;
use crate::core::error::ErrorKind;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum sanitized message length in characters, before the marker.
pub const MAX_MESSAGE_LENGTH: usize = 512;
/// Marker appended to truncated messages.
pub const TRUNCATION_MARKER: &str = "[truncated]";
/// Marker substituted for redacted values and words.
pub const REDACTION_MARKER: &str = "[REDACTED]";
/// Placeholder substituted for home-directory path prefixes.
pub const HOME_PLACEHOLDER: &str = "[HOME]";
/// Minimum length of an opaque run replaced by the final pipeline step.
pub const MIN_OPAQUE_RUN_LENGTH: usize = 20;

/// Key-name fragments that force parameter redaction.
///
/// Matching is case-insensitive substring containment on the lowercased key,
/// so `apiKey`, `API_KEY`, and `github_token` all match.
const SENSITIVE_KEY_FRAGMENTS: [&str; 7] =
    ["token", "secret", "api_key", "api-key", "apikey", "password", "auth"];

/// Sensitive word alternation shared by the message patterns.
const SENSITIVE_WORDS: &str = "token|secret|api[ _-]?key|password|auth";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when constructing the sanitizer.
#[derive(Debug, Error)]
pub enum SanitizeError {
    /// A redaction pattern failed to compile.
    #[error("invalid redaction pattern: {0}")]
    Pattern(String),
}

// ============================================================================
// SECTION: Sanitizer
// ============================================================================

/// Shared redaction pipeline for messages and parameter maps.
///
/// # Invariants
/// - Patterns are compiled once at construction; sanitization never fails.
/// - The same instance backs the ledger and the boundary error path.
pub struct ErrorSanitizer {
    /// Sensitive word immediately followed by a value.
    credential_pair: Regex,
    /// Bare sensitive word without an adjacent value.
    bare_word: Regex,
    /// Unix- and windows-style home directory prefixes.
    home_prefix: Regex,
    /// Long opaque alphanumeric/hyphen/underscore runs.
    opaque_run: Regex,
}

impl ErrorSanitizer {
    /// Compiles the redaction patterns.
    ///
    /// # Errors
    ///
    /// Returns [`SanitizeError::Pattern`] when a pattern fails to compile;
    /// construction happens once at process start and fails closed.
    pub fn new() -> Result<Self, SanitizeError> {
        let credential_pair =
            compile(&format!(r"(?i)\b({SENSITIVE_WORDS})\b\s*[:=]?\s*[A-Za-z0-9._/+-]{{2,}}"))?;
        let bare_word = compile(&format!(r"(?i)\b({SENSITIVE_WORDS})\b"))?;
        let home_prefix =
            compile(r"(?i)(?:/home/[^/\s]+|/Users/[^/\s]+|[A-Za-z]:[/\\]Users[/\\][^/\\\s]+)")?;
        let opaque_run = compile(&format!(r"[A-Za-z0-9_-]{{{MIN_OPAQUE_RUN_LENGTH},}}"))?;
        Ok(Self {
            credential_pair,
            bare_word,
            home_prefix,
            opaque_run,
        })
    }

    /// Sanitizes a raw message for external disclosure or logging.
    ///
    /// Steps run in a fixed order: truncate, redact credential pairs, redact
    /// bare sensitive words, replace home-directory prefixes, replace long
    /// opaque runs.
    #[must_use]
    pub fn sanitize_message(&self, raw: &str) -> String {
        let truncated = truncate(raw);
        let paired = self
            .credential_pair
            .replace_all(&truncated, format!("${{1}} {REDACTION_MARKER}").as_str());
        let worded = self.bare_word.replace_all(&paired, REDACTION_MARKER);
        let homed = self.home_prefix.replace_all(&worded, HOME_PLACEHOLDER);
        self.opaque_run.replace_all(&homed, REDACTION_MARKER).into_owned()
    }

    /// Redacts a parameter map for persistence or disclosure.
    ///
    /// Any key whose lowercased name contains a sensitive fragment has its
    /// value replaced by the marker at any nesting depth; non-matching keys
    /// and their values pass through unchanged. Re-applying the pipeline is a
    /// no-op.
    #[must_use]
    pub fn redact_parameters(&self, parameters: &Value) -> Value {
        redact_value(parameters)
    }

    /// Builds a boundary envelope from a raw internal message.
    #[must_use]
    pub fn envelope(&self, kind: ErrorKind, raw_message: &str) -> ErrorEnvelope {
        ErrorEnvelope::new(kind, self.sanitize_message(raw_message))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Compiles one redaction pattern.
fn compile(pattern: &str) -> Result<Regex, SanitizeError> {
    Regex::new(pattern).map_err(|err| SanitizeError::Pattern(err.to_string()))
}

/// Truncates a message to the fixed maximum, appending the marker.
///
/// Truncation happens before any substitution so the cut is deterministic on
/// the raw input.
fn truncate(raw: &str) -> String {
    match raw.char_indices().nth(MAX_MESSAGE_LENGTH) {
        None => raw.to_string(),
        Some((boundary, _)) => {
            let mut out = raw[.. boundary].to_string();
            out.push_str(TRUNCATION_MARKER);
            out
        }
    }
}

/// Returns true when a parameter key forces redaction.
fn is_sensitive_key(key: &str) -> bool {
    let lowered = key.to_lowercase();
    SENSITIVE_KEY_FRAGMENTS.iter().any(|fragment| lowered.contains(fragment))
}

/// Recursively redacts sensitive keys inside a JSON value.
fn redact_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(redact_map(map)),
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        other => other.clone(),
    }
}

/// Redacts sensitive keys inside one JSON object.
fn redact_map(map: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::with_capacity(map.len());
    for (key, value) in map {
        if is_sensitive_key(key) {
            out.insert(key.clone(), Value::String(REDACTION_MARKER.to_string()));
        } else {
            out.insert(key.clone(), redact_value(value));
        }
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
