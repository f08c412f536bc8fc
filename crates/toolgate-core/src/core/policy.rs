// crates/toolgate-core/src/core/policy.rs
// ============================================================================
// Module: Toolgate Guard Policy
// Description: Quota ceiling tables and the repository allowlist.
// Purpose: Keep ceilings and allowlists table-driven, apart from check logic.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Ceilings live in a [`QuotaPolicy`] table resolved per tier and dimension so
//! the limiter's check logic never hardcodes a number. The repository
//! allowlist is a closed set mapping identifier to credential; membership is
//! exact, never pattern-based. Both are built once from external
//! configuration and are immutable for the process lifetime.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::RepositoryId;
use crate::core::identifiers::Tier;

// ============================================================================
// SECTION: Quota Dimensions
// ============================================================================

/// Independently windowed quota dimension.
///
/// # Invariants
/// - Variants are stable for usage snapshots and audit labeling.
/// - Each dimension owns exactly one window length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaDimension {
    /// Downstream API calls per minute.
    CallsPerMinute,
    /// Sandbox creations per hour.
    SandboxCreatesPerHour,
    /// Cumulative downstream execution milliseconds per day.
    ExecutionMsPerDay,
}

impl QuotaDimension {
    /// Returns the fixed window length for the dimension in milliseconds.
    #[must_use]
    pub const fn window_ms(self) -> i64 {
        match self {
            Self::CallsPerMinute => 60_000,
            Self::SandboxCreatesPerHour => 3_600_000,
            Self::ExecutionMsPerDay => 86_400_000,
        }
    }

    /// Returns a stable label for the dimension.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CallsPerMinute => "calls_per_minute",
            Self::SandboxCreatesPerHour => "sandbox_creates_per_hour",
            Self::ExecutionMsPerDay => "execution_ms_per_day",
        }
    }
}

impl fmt::Display for QuotaDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Quota Policy
// ============================================================================

/// Per-tier ceilings for each quota dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCeilings {
    /// Maximum downstream API calls per minute.
    pub calls_per_minute: u64,
    /// Maximum sandbox creations per hour.
    pub sandbox_creates_per_hour: u64,
    /// Maximum cumulative execution milliseconds per day.
    pub execution_ms_per_day: u64,
}

impl TierCeilings {
    /// Returns the ceiling for a dimension.
    #[must_use]
    pub const fn ceiling(&self, dimension: QuotaDimension) -> u64 {
        match dimension {
            QuotaDimension::CallsPerMinute => self.calls_per_minute,
            QuotaDimension::SandboxCreatesPerHour => self.sandbox_creates_per_hour,
            QuotaDimension::ExecutionMsPerDay => self.execution_ms_per_day,
        }
    }
}

/// Default free-tier ceilings.
pub const DEFAULT_FREE_CEILINGS: TierCeilings = TierCeilings {
    calls_per_minute: 10,
    sandbox_creates_per_hour: 5,
    execution_ms_per_day: 3_600_000,
};

/// Default pro-tier ceilings.
pub const DEFAULT_PRO_CEILINGS: TierCeilings = TierCeilings {
    calls_per_minute: 100,
    sandbox_creates_per_hour: 100,
    execution_ms_per_day: 86_400_000,
};

/// Table-driven quota ceilings resolved per tier.
///
/// # Invariants
/// - The table is immutable after construction; the limiter only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaPolicy {
    /// Ceilings applied to free-tier callers.
    pub free: TierCeilings,
    /// Ceilings applied to pro-tier callers.
    pub pro: TierCeilings,
}

impl QuotaPolicy {
    /// Creates a policy from explicit per-tier ceilings.
    #[must_use]
    pub const fn new(free: TierCeilings, pro: TierCeilings) -> Self {
        Self {
            free,
            pro,
        }
    }

    /// Returns the ceilings for a tier.
    #[must_use]
    pub const fn ceilings(&self, tier: Tier) -> &TierCeilings {
        match tier {
            Tier::Free => &self.free,
            Tier::Pro => &self.pro,
        }
    }
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FREE_CEILINGS, DEFAULT_PRO_CEILINGS)
    }
}

/// Effective usage against one dimension's ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaUsage {
    /// Units consumed in the current window.
    pub current: u64,
    /// Ceiling for the window.
    pub limit: u64,
}

/// Side-effect-free usage snapshot keyed by dimension.
pub type UsageSnapshot = BTreeMap<QuotaDimension, QuotaUsage>;

// ============================================================================
// SECTION: Repository Allowlist
// ============================================================================

/// Credential bound to an allowlisted repository.
///
/// # Invariants
/// - The secret value never appears in `Debug` output or serialized forms.
#[derive(Clone, PartialEq, Eq)]
pub struct RepositoryCredential(String);

impl RepositoryCredential {
    /// Creates a credential from its secret value.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Returns the secret value for downstream authentication.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RepositoryCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RepositoryCredential([REDACTED])")
    }
}

/// Closed, statically configured set of permitted repositories.
///
/// # Invariants
/// - Membership is exact identifier equality; no pattern matching.
/// - The set is immutable after construction.
#[derive(Debug, Clone, Default)]
pub struct RepositoryAllowlist {
    /// Permitted repository identifiers mapped to their credentials.
    entries: BTreeMap<String, RepositoryCredential>,
}

impl RepositoryAllowlist {
    /// Builds an allowlist from identifier/credential pairs.
    #[must_use]
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, RepositoryCredential)>,
    {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Returns true when the repository is allowlisted.
    #[must_use]
    pub fn contains(&self, repository: &RepositoryId) -> bool {
        self.entries.contains_key(repository.as_str())
    }

    /// Returns the credential for an allowlisted repository.
    #[must_use]
    pub fn credential(&self, repository: &RepositoryId) -> Option<&RepositoryCredential> {
        self.entries.get(repository.as_str())
    }

    /// Returns the number of allowlisted repositories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no repositories are allowlisted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
