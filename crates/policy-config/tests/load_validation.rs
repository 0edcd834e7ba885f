// crates/policy-config/tests/load_validation.rs
// =============================================================================
// Module: Load Validation Tests
// Description: Tests for reading configuration files from disk.
// Purpose: Ensure file loading fails closed on size, encoding, and syntax.
// =============================================================================
//! Load validation tests for policy-config.

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

use policy_config::AuditSinkKind;
use policy_config::ConfigError;
use policy_config::PolicyConversionConfig;

mod common;

type TestResult = Result<(), String>;

#[test]
fn load_reads_a_valid_file() -> TestResult {
    let toml = br#"
[conversion]
served_versions = ["kyverno.io/v1", "v2"]
max_batch_objects = 32

[validation]
cluster_scoped_kinds = ["Namespace", "ClusterRole"]

[audit]
sink = "stderr"
"#;
    let (_dir, path) = common::write_config(toml).map_err(|err| err.to_string())?;
    let config = PolicyConversionConfig::load(Some(&path)).map_err(|err| err.to_string())?;
    assert_eq!(config.conversion.max_batch_objects, 32);
    assert_eq!(config.audit.sink, AuditSinkKind::Stderr);
    assert_eq!(config.conversion.served_api_versions().map_err(|err| err.to_string())?.len(), 2);
    Ok(())
}

#[test]
fn load_rejects_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = PolicyConversionConfig::load(Some(&dir.path().join("absent.toml")));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn load_or_default_still_rejects_a_named_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = PolicyConversionConfig::load_or_default(Some(&dir.path().join("absent.toml")));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn load_or_default_reads_a_named_file() -> TestResult {
    let (_dir, path) =
        common::write_config(b"[conversion]\nmax_batch_objects = 8\n").map_err(|err| err.to_string())?;
    let config =
        PolicyConversionConfig::load_or_default(Some(&path)).map_err(|err| err.to_string())?;
    assert_eq!(config.conversion.max_batch_objects, 8);
    Ok(())
}

#[test]
fn load_rejects_non_utf8() -> TestResult {
    let (_dir, path) = common::write_config(&[0xff, 0xfe, 0x00]).map_err(|err| err.to_string())?;
    common::assert_invalid(PolicyConversionConfig::load(Some(&path)), "utf-8")
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut contents = b"# padding\n".repeat(1024 * 110);
    contents.extend_from_slice(b"[conversion]\n");
    let (_dir, path) = common::write_config(&contents).map_err(|err| err.to_string())?;
    common::assert_invalid(PolicyConversionConfig::load(Some(&path)), "size limit")
}

#[test]
fn load_reports_parse_errors() {
    let (_dir, path) = common::write_config(b"[conversion\nmax_batch_objects = ").unwrap();
    let result = PolicyConversionConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn load_rejects_unknown_enum_values() {
    let (_dir, path) = common::write_config(b"[audit]\nsink = \"syslog\"\n").unwrap();
    let result = PolicyConversionConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn load_runs_validation() -> TestResult {
    let (_dir, path) =
        common::write_config(b"[conversion]\nmax_batch_objects = 0\n").map_err(|err| err.to_string())?;
    common::assert_invalid(PolicyConversionConfig::load(Some(&path)), "max_batch_objects")
}
