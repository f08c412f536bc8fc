// crates/toolgate-core/src/core/time.rs
// ============================================================================
// Module: Toolgate Time Helpers
// Description: Unix millisecond and RFC 3339 timestamp conversions.
// Purpose: Provide one timestamp representation for records and windows.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Window arithmetic inside the guard layer works on unix epoch milliseconds;
//! persisted audit records carry an RFC 3339 UTC string. This module owns the
//! conversion between the two so every component renders timestamps the same
//! way. Wall-clock reads go through the [`crate::interfaces::Clock`] seam so
//! window-boundary behavior stays testable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when converting timestamps.
#[derive(Debug, Error)]
pub enum TimeError {
    /// Millisecond value outside the representable datetime range.
    #[error("timestamp out of range: {0}")]
    OutOfRange(String),
    /// RFC 3339 rendering failed.
    #[error("failed to format timestamp: {0}")]
    Format(String),
}

// ============================================================================
// SECTION: Conversions
// ============================================================================

/// Returns the current unix epoch in milliseconds.
#[must_use]
pub fn unix_millis_now() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

/// Renders unix epoch milliseconds as an RFC 3339 UTC string.
///
/// # Errors
///
/// Returns [`TimeError`] when the value is unrepresentable or rendering fails.
pub fn rfc3339_from_unix_millis(millis: i64) -> Result<String, TimeError> {
    let nanos = i128::from(millis) * 1_000_000;
    let datetime = OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .map_err(|err| TimeError::OutOfRange(err.to_string()))?;
    datetime.format(&Rfc3339).map_err(|err| TimeError::Format(err.to_string()))
}

/// Parses an RFC 3339 string back to unix epoch milliseconds.
///
/// # Errors
///
/// Returns [`TimeError`] when the value is not a valid RFC 3339 timestamp.
pub fn unix_millis_from_rfc3339(value: &str) -> Result<i64, TimeError> {
    let datetime = OffsetDateTime::parse(value, &Rfc3339)
        .map_err(|err| TimeError::OutOfRange(err.to_string()))?;
    let millis = datetime.unix_timestamp_nanos() / 1_000_000;
    i64::try_from(millis).map_err(|err| TimeError::OutOfRange(err.to_string()))
}
