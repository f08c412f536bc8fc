// crates/toolgate-core/src/core/error.rs
// ============================================================================
// Module: Toolgate Boundary Errors
// Description: Closed error-kind enum and outward-facing error envelope.
// Purpose: Give the gateway boundary one stable, leak-free failure surface.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every failure that crosses the gateway boundary is classified into one
//! kind from a closed enum. Each kind carries a status-like code and a
//! retryable flag; free-form detail travels only as sanitized message text
//! inside an [`ErrorEnvelope`]. Raw provider errors never reach the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Error Kinds
// ============================================================================

/// Closed classification of failures surfaced at the gateway boundary.
///
/// # Invariants
/// - Variants are stable; codes and retryable flags never change per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Repository identifier not present in the allowlist.
    InvalidRepository,
    /// Downstream resource does not exist.
    ResourceNotFound,
    /// Downstream provider rejected our credentials.
    UpstreamAuthFailure,
    /// Per-window call ceiling reached.
    RateLimitExceeded,
    /// Branch name failed validation.
    InvalidBranch,
    /// Path failed traversal or prefix checks.
    PathTraversal,
    /// Caller-supplied token has expired.
    TokenExpired,
    /// Downstream execution exceeded its deadline.
    ExecutionTimeout,
    /// Payload exceeds the permitted file size.
    FileSizeExceeded,
    /// Cumulative execution budget exhausted.
    QuotaExceeded,
    /// Caller lacks permission for the operation.
    PermissionDenied,
    /// Unexpected internal failure.
    Internal,
    /// Request shape failed validation.
    Validation,
}

impl ErrorKind {
    /// Returns the status-like numeric code for the kind.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::InvalidRepository | Self::InvalidBranch | Self::PathTraversal
            | Self::Validation => 400,
            Self::TokenExpired => 401,
            Self::PermissionDenied => 403,
            Self::ResourceNotFound => 404,
            Self::FileSizeExceeded => 413,
            Self::RateLimitExceeded | Self::QuotaExceeded => 429,
            Self::Internal => 500,
            Self::UpstreamAuthFailure => 502,
            Self::ExecutionTimeout => 504,
        }
    }

    /// Returns true when callers may retry the failed operation.
    #[must_use]
    pub const fn retryable(self) -> bool {
        matches!(self, Self::RateLimitExceeded | Self::QuotaExceeded | Self::ExecutionTimeout)
    }

    /// Returns a stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRepository => "invalid_repository",
            Self::ResourceNotFound => "resource_not_found",
            Self::UpstreamAuthFailure => "upstream_auth_failure",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::InvalidBranch => "invalid_branch",
            Self::PathTraversal => "path_traversal",
            Self::TokenExpired => "token_expired",
            Self::ExecutionTimeout => "execution_timeout",
            Self::FileSizeExceeded => "file_size_exceeded",
            Self::QuotaExceeded => "quota_exceeded",
            Self::PermissionDenied => "permission_denied",
            Self::Internal => "internal_error",
            Self::Validation => "validation_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Error Envelope
// ============================================================================

/// Outward-facing failure shape returned to the untrusted caller.
///
/// # Invariants
/// - `message` has already passed through the shared sanitizer pipeline.
/// - `retryable` mirrors the kind; `retry_after_secs` is set only for
///   throttle and quota rejections.
/// - Envelopes are ephemeral; only the sanitized message text may be stored
///   in an audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Failure classification.
    pub kind: ErrorKind,
    /// Sanitized, disclosure-safe message text.
    pub message: String,
    /// Whether callers may retry the operation.
    pub retryable: bool,
    /// Seconds until the relevant quota window resets, when applicable.
    pub retry_after_secs: Option<u64>,
}

impl ErrorEnvelope {
    /// Creates an envelope from an already-sanitized message.
    #[must_use]
    pub const fn new(kind: ErrorKind, message: String) -> Self {
        Self {
            kind,
            message,
            retryable: kind.retryable(),
            retry_after_secs: None,
        }
    }

    /// Attaches a wait hint for retryable rejections.
    #[must_use]
    pub const fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after_secs = Some(secs);
        self
    }
}
