// crates/toolgate-config/tests/config_defaults.rs
// ============================================================================
// Module: Config Defaults Tests
// Description: Tests for default values and policy construction.
// Purpose: Validate empty config yields the documented defaults.
// ============================================================================

//! ## Overview
//! Validates that an empty TOML document parses to the documented default
//! ceilings and audit settings, and that the loaded model maps cleanly onto
//! the core policy types.

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

use toolgate_config::ToolgateConfig;
use toolgate_core::QuotaDimension;
use toolgate_core::RepositoryId;
use toolgate_core::Tier;

// ============================================================================
// SECTION: Default Tests
// ============================================================================

#[test]
fn empty_config_uses_documented_defaults() {
    let config = ToolgateConfig::parse("").expect("empty config parses");
    assert_eq!(config.quotas.free.calls_per_minute, 10);
    assert_eq!(config.quotas.free.sandbox_creates_per_hour, 5);
    assert_eq!(config.quotas.free.execution_ms_per_day, 3_600_000);
    assert_eq!(config.quotas.pro.calls_per_minute, 100);
    assert_eq!(config.quotas.pro.sandbox_creates_per_hour, 100);
    assert_eq!(config.quotas.pro.execution_ms_per_day, 86_400_000);
    assert!(config.repositories.is_empty());
    assert_eq!(config.audit.busy_timeout_ms, 5_000);
    assert!(config.audit.alert_log.is_none());
}

#[test]
fn quota_policy_maps_loaded_ceilings() {
    let content = r#"
        [quotas.free]
        calls_per_minute = 3
        sandbox_creates_per_hour = 2
        execution_ms_per_day = 1000

        [quotas.pro]
        calls_per_minute = 30
        sandbox_creates_per_hour = 20
        execution_ms_per_day = 10000
    "#;
    let config = ToolgateConfig::parse(content).expect("config parses");
    let policy = config.quota_policy();
    assert_eq!(policy.ceilings(Tier::Free).ceiling(QuotaDimension::CallsPerMinute), 3);
    assert_eq!(policy.ceilings(Tier::Free).ceiling(QuotaDimension::SandboxCreatesPerHour), 2);
    assert_eq!(policy.ceilings(Tier::Free).ceiling(QuotaDimension::ExecutionMsPerDay), 1_000);
    assert_eq!(policy.ceilings(Tier::Pro).ceiling(QuotaDimension::CallsPerMinute), 30);
}

#[test]
fn repository_allowlist_maps_loaded_entries() {
    let content = r#"
        [[repositories]]
        id = "acme/widgets"
        credential = "ghp_example"

        [[repositories]]
        id = "acme/gadgets"
        credential = "ghp_other"
    "#;
    let config = ToolgateConfig::parse(content).expect("config parses");
    let allowlist = config.repository_allowlist();
    assert_eq!(allowlist.len(), 2);
    assert!(allowlist.contains(&RepositoryId::new("acme/widgets")));
    let credential =
        allowlist.credential(&RepositoryId::new("acme/gadgets")).expect("credential present");
    assert_eq!(credential.secret(), "ghp_other");
    assert!(!allowlist.contains(&RepositoryId::new("acme/unknown")));
}

#[test]
fn sqlite_store_config_maps_audit_section() {
    let content = r#"
        [audit]
        db_path = "var-data/audit.db"
        busy_timeout_ms = 250
        journal_mode = "delete"
        sync_mode = "normal"
    "#;
    let config = ToolgateConfig::parse(content).expect("config parses");
    let store = config.sqlite_store_config();
    assert_eq!(store.path.to_string_lossy(), "var-data/audit.db");
    assert_eq!(store.busy_timeout_ms, 250);
}

#[test]
fn load_reads_a_config_file_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("toolgate.toml");
    std::fs::write(
        &path,
        "[quotas.free]\ncalls_per_minute = 7\nsandbox_creates_per_hour = 2\n\
         execution_ms_per_day = 5000\n",
    )
    .expect("write config");
    let config = ToolgateConfig::load(Some(&path)).expect("config loads");
    assert_eq!(config.quotas.free.calls_per_minute, 7);
}
