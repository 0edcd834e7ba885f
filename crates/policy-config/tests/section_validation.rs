// crates/policy-config/tests/section_validation.rs
// =============================================================================
// Module: Section Validation Tests
// Description: Tests for per-section limits and cross-field rules.
// Purpose: Ensure every section rejects out-of-range or inconsistent values.
// =============================================================================
//! Section validation tests for policy-config.

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

use policy_api::ApiVersion;
use policy_api::ResourceScope;
use policy_config::AuditSinkKind;

mod common;

type TestResult = Result<(), String>;

// Test constants (from config.rs)
const MAX_BATCH_OBJECTS: usize = 4096;
const MIN_OBJECT_BYTES: usize = 1024;
const MAX_OBJECT_BYTES: usize = 16 * 1024 * 1024;

#[test]
fn defaults_are_valid() -> TestResult {
    let config = common::minimal_config().map_err(|err| err.to_string())?;
    config.validate().map_err(|err| err.to_string())?;
    assert_eq!(
        config.conversion.served_api_versions().map_err(|err| err.to_string())?,
        vec![ApiVersion::V1, ApiVersion::V2]
    );
    assert_eq!(config.audit.sink, AuditSinkKind::None);
    assert!(config.validation.resource_scope().is_cluster_scoped("Namespace"));
    Ok(())
}

#[test]
fn served_versions_must_include_hub() -> TestResult {
    let config = common::config_from_toml("[conversion]\nserved_versions = [\"v2\"]\n")
        .map_err(|err| err.to_string())?;
    common::assert_invalid(config.validate(), "storage version")
}

#[test]
fn served_versions_reject_unknown_values() -> TestResult {
    let config = common::config_from_toml("[conversion]\nserved_versions = [\"v1\", \"v3\"]\n")
        .map_err(|err| err.to_string())?;
    common::assert_invalid(config.validate(), "unknown version: v3")
}

#[test]
fn batch_limit_bounds() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.conversion.max_batch_objects = MAX_BATCH_OBJECTS;
    config.validate().map_err(|err| err.to_string())?;
    config.conversion.max_batch_objects = MAX_BATCH_OBJECTS + 1;
    common::assert_invalid(config.validate(), "max_batch_objects")
}

#[test]
fn object_size_bounds() -> TestResult {
    let mut config = common::minimal_config().map_err(|err| err.to_string())?;
    config.conversion.max_object_bytes = MIN_OBJECT_BYTES;
    config.validate().map_err(|err| err.to_string())?;
    config.conversion.max_object_bytes = MAX_OBJECT_BYTES;
    config.validate().map_err(|err| err.to_string())?;
    config.conversion.max_object_bytes = MIN_OBJECT_BYTES - 1;
    common::assert_invalid(config.validate(), "max_object_bytes")?;
    config.conversion.max_object_bytes = MAX_OBJECT_BYTES + 1;
    common::assert_invalid(config.validate(), "max_object_bytes")
}

#[test]
fn cluster_scoped_kinds_must_be_clean() -> TestResult {
    let empty = common::config_from_toml("[validation]\ncluster_scoped_kinds = []\n")
        .map_err(|err| err.to_string())?;
    common::assert_invalid(empty.validate(), "non-empty")?;
    let qualified =
        common::config_from_toml("[validation]\ncluster_scoped_kinds = [\"v1/Namespace\"]\n")
            .map_err(|err| err.to_string())?;
    common::assert_invalid(qualified.validate(), "invalid kind")?;
    let duplicate =
        common::config_from_toml("[validation]\ncluster_scoped_kinds = [\"Node\", \" Node\"]\n")
            .map_err(|err| err.to_string())?;
    common::assert_invalid(duplicate.validate(), "duplicate kind: Node")
}

#[test]
fn custom_cluster_scope_replaces_builtin_list() -> TestResult {
    let config =
        common::config_from_toml("[validation]\ncluster_scoped_kinds = [\"Tenant\"]\n")
            .map_err(|err| err.to_string())?;
    let scope = config.validation.resource_scope();
    assert!(scope.is_cluster_scoped("Tenant"));
    assert!(!scope.is_cluster_scoped("Namespace"));
    Ok(())
}

#[test]
fn file_sink_requires_path() -> TestResult {
    let missing = common::config_from_toml("[audit]\nsink = \"file\"\n").map_err(|err| err.to_string())?;
    common::assert_invalid(missing.validate(), "audit.path is required")?;
    let blank = common::config_from_toml("[audit]\nsink = \"file\"\npath = \" \"\n")
        .map_err(|err| err.to_string())?;
    common::assert_invalid(blank.validate(), "non-empty")?;
    let stray = common::config_from_toml("[audit]\nsink = \"stderr\"\npath = \"audit.log\"\n")
        .map_err(|err| err.to_string())?;
    common::assert_invalid(stray.validate(), "only valid for the file sink")
}
