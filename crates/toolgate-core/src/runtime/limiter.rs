// crates/toolgate-core/src/runtime/limiter.rs
// ============================================================================
// Module: Rate Limiting
// Description: Per-caller fixed-window quota accounting.
// Purpose: Admit or reject gated calls and meter downstream execution time.
// Dependencies: crate::core, crate::interfaces, crate::runtime::sanitize
// ============================================================================

//! ## Overview
//! Counters are fixed windows keyed by caller and dimension. A window's
//! boundary is checked lazily on each access; there is no background timer
//! thread. This permits up to roughly two ceilings of traffic exactly at a
//! window boundary — a deliberate simplicity trade-off over burst smoothing.
//! Ceilings come from the [`QuotaPolicy`] table and are never inlined with
//! the check logic. All counter mutation happens under one lock so
//! concurrent admits for the same key cannot race past each other.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use thiserror::Error;

use crate::core::error::ErrorEnvelope;
use crate::core::error::ErrorKind;
use crate::core::identifiers::CallerId;
use crate::core::identifiers::OperationClass;
use crate::core::identifiers::Tier;
use crate::core::policy::QuotaDimension;
use crate::core::policy::QuotaPolicy;
use crate::core::policy::QuotaUsage;
use crate::core::policy::UsageSnapshot;
use crate::interfaces::Clock;
use crate::runtime::sanitize::ErrorSanitizer;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Rejection raised when a per-window call ceiling is reached.
///
/// # Invariants
/// - Always retryable; `retry_after_secs` counts to the window reset.
/// - `message` has passed through the shared sanitizer.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ThrottleError {
    /// Dimension whose ceiling was reached.
    pub dimension: QuotaDimension,
    /// Seconds until the relevant window resets.
    pub retry_after_secs: u64,
    /// Sanitized rejection message.
    pub message: String,
}

impl From<ThrottleError> for ErrorEnvelope {
    fn from(error: ThrottleError) -> Self {
        Self::new(ErrorKind::RateLimitExceeded, error.message)
            .with_retry_after(error.retry_after_secs)
    }
}

/// Rejection raised when the daily execution budget is exhausted.
///
/// # Invariants
/// - Always retryable; `retry_after_secs` counts to the window reset.
/// - The crossing call's duration is still consumed before this is raised.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct QuotaError {
    /// Seconds until the daily window resets.
    pub retry_after_secs: u64,
    /// Sanitized rejection message.
    pub message: String,
}

impl From<QuotaError> for ErrorEnvelope {
    fn from(error: QuotaError) -> Self {
        Self::new(ErrorKind::QuotaExceeded, error.message).with_retry_after(error.retry_after_secs)
    }
}

// ============================================================================
// SECTION: Window Counters
// ============================================================================

/// One fixed-window counter.
///
/// # Invariants
/// - `count` never goes negative (unsigned) and `reset_at_ms` only moves
///   forward.
/// - The counter resets exactly once per boundary crossing, lazily on the
///   first access after the boundary.
#[derive(Debug, Clone, Copy)]
struct WindowCounter {
    /// Units consumed in the current window.
    count: u64,
    /// Instant the current window ends (unix millis).
    reset_at_ms: i64,
}

impl WindowCounter {
    /// Creates a fresh counter whose window starts now.
    const fn new(now_ms: i64, window_ms: i64) -> Self {
        Self {
            count: 0,
            reset_at_ms: now_ms + window_ms,
        }
    }

    /// Applies the lazy boundary check, resetting an elapsed window.
    const fn roll(&mut self, now_ms: i64, window_ms: i64) {
        if now_ms >= self.reset_at_ms {
            self.count = 0;
            self.reset_at_ms = now_ms + window_ms;
        }
    }

    /// Returns the effective count without mutating the counter.
    const fn effective_count(&self, now_ms: i64) -> u64 {
        if now_ms >= self.reset_at_ms { 0 } else { self.count }
    }

    /// Returns whole seconds until the window resets, at least one.
    const fn retry_after_secs(&self, now_ms: i64) -> u64 {
        let remaining_ms = self.reset_at_ms.saturating_sub(now_ms);
        // Equivalent to `remaining_ms.div_ceil(1000)`, which is not yet stable
        // as a const fn for signed integers.
        let quotient = remaining_ms / 1000;
        let secs = if remaining_ms % 1000 > 0 { quotient + 1 } else { quotient };
        if secs < 1 {
            1
        } else {
            secs.unsigned_abs()
        }
    }
}

/// Window counters tracked for one caller.
#[derive(Debug, Clone, Copy)]
struct CallerWindows {
    /// Downstream API calls this minute.
    calls: WindowCounter,
    /// Sandbox creations this hour.
    creates: WindowCounter,
    /// Execution milliseconds consumed today.
    execution: WindowCounter,
}

impl CallerWindows {
    /// Creates fresh windows for a caller first seen now.
    const fn new(now_ms: i64) -> Self {
        Self {
            calls: WindowCounter::new(now_ms, QuotaDimension::CallsPerMinute.window_ms()),
            creates: WindowCounter::new(now_ms, QuotaDimension::SandboxCreatesPerHour.window_ms()),
            execution: WindowCounter::new(now_ms, QuotaDimension::ExecutionMsPerDay.window_ms()),
        }
    }

    /// Returns the counter for a dimension.
    const fn counter_mut(&mut self, dimension: QuotaDimension) -> &mut WindowCounter {
        match dimension {
            QuotaDimension::CallsPerMinute => &mut self.calls,
            QuotaDimension::SandboxCreatesPerHour => &mut self.creates,
            QuotaDimension::ExecutionMsPerDay => &mut self.execution,
        }
    }

    /// Returns the counter for a dimension without mutation.
    const fn counter(&self, dimension: QuotaDimension) -> &WindowCounter {
        match dimension {
            QuotaDimension::CallsPerMinute => &self.calls,
            QuotaDimension::SandboxCreatesPerHour => &self.creates,
            QuotaDimension::ExecutionMsPerDay => &self.execution,
        }
    }
}

// ============================================================================
// SECTION: Rate Limiter
// ============================================================================

/// Per-caller quota accounting across independent fixed windows.
///
/// # Invariants
/// - Counters are mutated only under the internal lock.
/// - Counters are in-memory only; continuity across restarts is out of
///   scope.
pub struct RateLimiter {
    /// Table-driven ceilings per tier and dimension.
    policy: QuotaPolicy,
    /// Shared sanitizer used for rejection messages.
    sanitizer: Arc<ErrorSanitizer>,
    /// Wall-clock seam.
    clock: Arc<dyn Clock>,
    /// Window counters keyed by caller.
    windows: Mutex<HashMap<CallerId, CallerWindows>>,
}

impl RateLimiter {
    /// Creates a limiter over a ceiling table, sanitizer, and clock.
    #[must_use]
    pub fn new(policy: QuotaPolicy, sanitizer: Arc<ErrorSanitizer>, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            sanitizer,
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Admits or rejects a call for the caller, tier, and operation class.
    ///
    /// # Errors
    ///
    /// Returns [`ThrottleError`] with a wait hint when the window ceiling is
    /// reached; the counter is consumed only on admission.
    pub fn admit(
        &self,
        caller: &CallerId,
        tier: Tier,
        class: OperationClass,
    ) -> Result<(), ThrottleError> {
        let dimension = match class {
            OperationClass::ApiCall => QuotaDimension::CallsPerMinute,
            OperationClass::CreateSandbox => QuotaDimension::SandboxCreatesPerHour,
        };
        let ceiling = self.policy.ceilings(tier).ceiling(dimension);
        let now_ms = self.clock.now_unix_millis();
        let mut windows = self.lock_windows();
        let entry = windows.entry(caller.clone()).or_insert_with(|| CallerWindows::new(now_ms));
        let counter = entry.counter_mut(dimension);
        counter.roll(now_ms, dimension.window_ms());
        if counter.count >= ceiling {
            let retry_after_secs = counter.retry_after_secs(now_ms);
            return Err(ThrottleError {
                dimension,
                retry_after_secs,
                message: self.sanitizer.sanitize_message(&format!(
                    "rate limit exceeded for {dimension}: retry in {retry_after_secs}s"
                )),
            });
        }
        counter.count += 1;
        Ok(())
    }

    /// Meters downstream execution time against the daily budget.
    ///
    /// Must be invoked exactly once per completed downstream operation
    /// regardless of its own success or failure; the duration is consumed
    /// even on the call that crosses the ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError`] with a wait hint on the call whose cumulative
    /// duration crosses the daily ceiling, and on every later call in the
    /// same window.
    pub fn record_execution(
        &self,
        caller: &CallerId,
        tier: Tier,
        duration_ms: u64,
    ) -> Result<(), QuotaError> {
        let dimension = QuotaDimension::ExecutionMsPerDay;
        let ceiling = self.policy.ceilings(tier).ceiling(dimension);
        let now_ms = self.clock.now_unix_millis();
        let mut windows = self.lock_windows();
        let entry = windows.entry(caller.clone()).or_insert_with(|| CallerWindows::new(now_ms));
        let counter = entry.counter_mut(dimension);
        counter.roll(now_ms, dimension.window_ms());
        counter.count = counter.count.saturating_add(duration_ms);
        if counter.count > ceiling {
            let retry_after_secs = counter.retry_after_secs(now_ms);
            return Err(QuotaError {
                retry_after_secs,
                message: self.sanitizer.sanitize_message(&format!(
                    "daily execution quota exceeded: retry in {retry_after_secs}s"
                )),
            });
        }
        Ok(())
    }

    /// Returns a side-effect-free usage snapshot for the caller.
    ///
    /// Effective counts are computed against the current instant without
    /// mutating any counter; an elapsed window reads as zero.
    #[must_use]
    pub fn usage(&self, caller: &CallerId, tier: Tier) -> UsageSnapshot {
        let ceilings = *self.policy.ceilings(tier);
        let now_ms = self.clock.now_unix_millis();
        let windows = self.lock_windows();
        let entry = windows.get(caller).copied();
        let mut snapshot = UsageSnapshot::new();
        for dimension in [
            QuotaDimension::CallsPerMinute,
            QuotaDimension::SandboxCreatesPerHour,
            QuotaDimension::ExecutionMsPerDay,
        ] {
            let current = entry
                .as_ref()
                .map_or(0, |windows| windows.counter(dimension).effective_count(now_ms));
            snapshot.insert(
                dimension,
                QuotaUsage {
                    current,
                    limit: ceilings.ceiling(dimension),
                },
            );
        }
        snapshot
    }

    /// Locks the window map, recovering from a poisoned lock.
    ///
    /// Counter state stays consistent under poisoning because every mutation
    /// completes before the lock is released.
    fn lock_windows(&self) -> std::sync::MutexGuard<'_, HashMap<CallerId, CallerWindows>> {
        match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
