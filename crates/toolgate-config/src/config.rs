// crates/toolgate-config/src/config.rs
// ============================================================================
// Module: Toolgate Configuration
// Description: Configuration loading and validation for Toolgate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: toolgate-core, toolgate-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits
//! and validated per section before any guard component is constructed.
//! Missing or invalid configuration fails closed. The loaded model produces
//! the core policy types (quota table, repository allowlist, store config)
//! consumed by the guard layer; identity-to-credential naming conventions
//! are resolved upstream and arrive here as an opaque closed set.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use toolgate_core::QuotaPolicy;
use toolgate_core::RepositoryAllowlist;
use toolgate_core::RepositoryCredential;
use toolgate_core::TierCeilings;
use toolgate_store_sqlite::SqliteJournalMode;
use toolgate_store_sqlite::SqliteStoreConfig;
use toolgate_store_sqlite::SqliteSyncMode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "toolgate.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "TOOLGATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of allowlisted repositories.
pub(crate) const MAX_REPOSITORIES: usize = 256;
/// Maximum length of a repository identifier.
pub(crate) const MAX_REPOSITORY_ID_LENGTH: usize = 256;
/// Maximum length of a repository credential.
pub(crate) const MAX_CREDENTIAL_LENGTH: usize = 512;
/// Maximum configurable calls-per-minute ceiling.
pub(crate) const MAX_CALLS_PER_MINUTE: u64 = 100_000;
/// Maximum configurable sandbox-creates-per-hour ceiling.
pub(crate) const MAX_SANDBOX_CREATES_PER_HOUR: u64 = 100_000;
/// Maximum configurable execution-ms-per-day ceiling (seven days of wall
/// time; values beyond this are configuration mistakes).
pub(crate) const MAX_EXECUTION_MS_PER_DAY: u64 = 7 * 86_400_000;
/// Default audit database filename.
const DEFAULT_AUDIT_DB_NAME: &str = "toolgate-audit.db";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Toolgate gateway configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ToolgateConfig {
    /// Quota ceilings per tier.
    #[serde(default)]
    pub quotas: QuotasConfig,
    /// Allowlisted repositories with their credentials.
    #[serde(default)]
    pub repositories: Vec<RepositoryEntry>,
    /// Audit ledger storage configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Quota ceilings for both tiers.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct QuotasConfig {
    /// Free-tier ceilings.
    #[serde(default = "default_free_quota")]
    pub free: TierQuotaConfig,
    /// Pro-tier ceilings.
    #[serde(default = "default_pro_quota")]
    pub pro: TierQuotaConfig,
}

impl Default for QuotasConfig {
    fn default() -> Self {
        Self {
            free: default_free_quota(),
            pro: default_pro_quota(),
        }
    }
}

/// Ceilings for one tier.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TierQuotaConfig {
    /// Maximum downstream API calls per minute.
    pub calls_per_minute: u64,
    /// Maximum sandbox creations per hour.
    pub sandbox_creates_per_hour: u64,
    /// Maximum cumulative execution milliseconds per day.
    pub execution_ms_per_day: u64,
}

/// Returns the default free-tier ceilings.
const fn default_free_quota() -> TierQuotaConfig {
    TierQuotaConfig {
        calls_per_minute: toolgate_core::DEFAULT_FREE_CEILINGS.calls_per_minute,
        sandbox_creates_per_hour: toolgate_core::DEFAULT_FREE_CEILINGS.sandbox_creates_per_hour,
        execution_ms_per_day: toolgate_core::DEFAULT_FREE_CEILINGS.execution_ms_per_day,
    }
}

/// Returns the default pro-tier ceilings.
const fn default_pro_quota() -> TierQuotaConfig {
    TierQuotaConfig {
        calls_per_minute: toolgate_core::DEFAULT_PRO_CEILINGS.calls_per_minute,
        sandbox_creates_per_hour: toolgate_core::DEFAULT_PRO_CEILINGS.sandbox_creates_per_hour,
        execution_ms_per_day: toolgate_core::DEFAULT_PRO_CEILINGS.execution_ms_per_day,
    }
}

/// One allowlisted repository with its downstream credential.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryEntry {
    /// Repository identifier (owner/name form).
    pub id: String,
    /// Credential used for downstream authentication.
    pub credential: String,
}

/// Audit ledger storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Path to the `SQLite` audit database file.
    #[serde(default = "default_audit_db_path")]
    pub db_path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Optional path for the emergency alert log; stderr when unset.
    #[serde(default)]
    pub alert_log: Option<PathBuf>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            db_path: default_audit_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
            alert_log: None,
        }
    }
}

/// Returns the default audit database path.
fn default_audit_db_path() -> PathBuf {
    PathBuf::from(DEFAULT_AUDIT_DB_NAME)
}

/// Returns the default busy timeout for the audit database.
const fn default_busy_timeout_ms() -> u64 {
    5_000
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Filesystem error while locating or reading the config.
    #[error("config io error: {0}")]
    Io(String),
    /// Invalid config contents or values.
    #[error("config invalid: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl ToolgateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit path argument, then the `TOOLGATE_CONFIG`
    /// environment variable, then `toolgate.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|err| ConfigError::Invalid(format!("config not valid utf-8: {err}")))?;
        Self::parse(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|err| ConfigError::Invalid(format!("config parse error: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every config section, failing closed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first violated bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_tier_quota("quotas.free", self.quotas.free)?;
        validate_tier_quota("quotas.pro", self.quotas.pro)?;
        validate_repositories(&self.repositories)?;
        validate_audit(&self.audit)?;
        Ok(())
    }

    /// Builds the core quota policy table from the loaded ceilings.
    #[must_use]
    pub const fn quota_policy(&self) -> QuotaPolicy {
        QuotaPolicy::new(
            TierCeilings {
                calls_per_minute: self.quotas.free.calls_per_minute,
                sandbox_creates_per_hour: self.quotas.free.sandbox_creates_per_hour,
                execution_ms_per_day: self.quotas.free.execution_ms_per_day,
            },
            TierCeilings {
                calls_per_minute: self.quotas.pro.calls_per_minute,
                sandbox_creates_per_hour: self.quotas.pro.sandbox_creates_per_hour,
                execution_ms_per_day: self.quotas.pro.execution_ms_per_day,
            },
        )
    }

    /// Builds the closed repository allowlist from the loaded entries.
    #[must_use]
    pub fn repository_allowlist(&self) -> RepositoryAllowlist {
        RepositoryAllowlist::from_entries(self.repositories.iter().map(|entry| {
            (entry.id.clone(), RepositoryCredential::new(entry.credential.clone()))
        }))
    }

    /// Builds the `SQLite` store configuration for the audit ledger.
    #[must_use]
    pub fn sqlite_store_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.audit.db_path.clone(),
            busy_timeout_ms: self.audit.busy_timeout_ms,
            journal_mode: self.audit.journal_mode,
            sync_mode: self.audit.sync_mode,
        }
    }
}

// ============================================================================
// SECTION: Path Resolution
// ============================================================================

/// Resolves the config path from argument, environment, or default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(value) = env::var(CONFIG_ENV_VAR) {
        if value.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("{CONFIG_ENV_VAR} must not be empty")));
        }
        return Ok(PathBuf::from(value));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates structural limits on the config path.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let total_length = path.as_os_str().len();
    if total_length > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds length limit".to_string()));
    }
    for component in path.components() {
        if let Component::Normal(part) = component
            && part.len() > MAX_PATH_COMPONENT_LENGTH
        {
            return Err(ConfigError::Invalid(
                "config path component exceeds length limit".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(ConfigError::Invalid(
            "config path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// SECTION: Section Validation
// ============================================================================

/// Validates ceilings for one tier.
fn validate_tier_quota(section: &str, quota: TierQuotaConfig) -> Result<(), ConfigError> {
    if quota.calls_per_minute == 0 || quota.calls_per_minute > MAX_CALLS_PER_MINUTE {
        return Err(ConfigError::Invalid(format!(
            "{section}.calls_per_minute out of range: {} (max {MAX_CALLS_PER_MINUTE})",
            quota.calls_per_minute
        )));
    }
    if quota.sandbox_creates_per_hour == 0
        || quota.sandbox_creates_per_hour > MAX_SANDBOX_CREATES_PER_HOUR
    {
        return Err(ConfigError::Invalid(format!(
            "{section}.sandbox_creates_per_hour out of range: {} (max \
             {MAX_SANDBOX_CREATES_PER_HOUR})",
            quota.sandbox_creates_per_hour
        )));
    }
    if quota.execution_ms_per_day == 0 || quota.execution_ms_per_day > MAX_EXECUTION_MS_PER_DAY {
        return Err(ConfigError::Invalid(format!(
            "{section}.execution_ms_per_day out of range: {} (max {MAX_EXECUTION_MS_PER_DAY})",
            quota.execution_ms_per_day
        )));
    }
    Ok(())
}

/// Validates the repository allowlist entries.
fn validate_repositories(entries: &[RepositoryEntry]) -> Result<(), ConfigError> {
    if entries.len() > MAX_REPOSITORIES {
        return Err(ConfigError::Invalid(format!(
            "repositories exceeds limit: {} (max {MAX_REPOSITORIES})",
            entries.len()
        )));
    }
    let mut seen = std::collections::BTreeSet::new();
    for entry in entries {
        validate_repository_id(&entry.id)?;
        if entry.credential.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "repository {} has an empty credential",
                entry.id
            )));
        }
        if entry.credential.len() > MAX_CREDENTIAL_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "repository {} credential exceeds length limit",
                entry.id
            )));
        }
        if !seen.insert(entry.id.as_str()) {
            return Err(ConfigError::Invalid(format!("duplicate repository id: {}", entry.id)));
        }
    }
    Ok(())
}

/// Validates one repository identifier.
fn validate_repository_id(id: &str) -> Result<(), ConfigError> {
    if id.is_empty() {
        return Err(ConfigError::Invalid("repository id must not be empty".to_string()));
    }
    if id.len() > MAX_REPOSITORY_ID_LENGTH {
        return Err(ConfigError::Invalid(format!("repository id exceeds length limit: {id}")));
    }
    let valid_chars =
        id.chars().all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '/' | '-'));
    if !valid_chars || id.contains("..") || id.contains("//") {
        return Err(ConfigError::Invalid(format!("repository id contains invalid syntax: {id}")));
    }
    Ok(())
}

/// Validates the audit storage section.
fn validate_audit(audit: &AuditConfig) -> Result<(), ConfigError> {
    if audit.db_path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid("audit.db_path must not be empty".to_string()));
    }
    if audit.busy_timeout_ms == 0 {
        return Err(ConfigError::Invalid(
            "audit.busy_timeout_ms must be greater than zero".to_string(),
        ));
    }
    if let Some(alert_log) = &audit.alert_log
        && alert_log.as_os_str().is_empty()
    {
        return Err(ConfigError::Invalid("audit.alert_log must not be empty".to_string()));
    }
    Ok(())
}
