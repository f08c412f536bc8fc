// crates/toolgate-core/src/runtime/mod.rs
// ============================================================================
// Module: Toolgate Runtime
// Description: Guard components executed on every gated request.
// Purpose: Group validation, sanitization, rate limiting, and the ledger.
// Dependencies: crate::runtime submodules
// ============================================================================

//! ## Overview
//! The runtime holds the four cooperating guards: [`validate`] rejects
//! unsafe request fields before any network call, [`sanitize`] is the shared
//! redaction pipeline, [`limiter`] enforces per-caller ceilings, and
//! [`ledger`] records every gated call. The composing gateway calls the
//! validator and limiter before dispatching downstream, then the ledger and
//! limiter's execution meter after completion.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod ledger;
pub mod limiter;
pub mod sanitize;
pub mod store;
pub mod validate;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use ledger::AppendParams;
pub use ledger::AuditLedger;
pub use limiter::QuotaError;
pub use limiter::RateLimiter;
pub use limiter::ThrottleError;
pub use sanitize::ErrorSanitizer;
pub use sanitize::HOME_PLACEHOLDER;
pub use sanitize::MAX_MESSAGE_LENGTH;
pub use sanitize::MIN_OPAQUE_RUN_LENGTH;
pub use sanitize::REDACTION_MARKER;
pub use sanitize::SanitizeError;
pub use sanitize::TRUNCATION_MARKER;
pub use store::InMemoryAuditStore;
pub use validate::BranchRejection;
pub use validate::FORBIDDEN_PATH_PREFIXES;
pub use validate::PathRejection;
pub use validate::RepositoryRejection;
pub use validate::RequestValidator;
pub use validate::ensure_safe_path;
pub use validate::ensure_valid_branch;
pub use validate::is_safe_path;
pub use validate::is_valid_branch;
