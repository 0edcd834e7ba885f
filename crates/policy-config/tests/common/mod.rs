// crates/policy-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for policy-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::fs;
use std::path::PathBuf;

use policy_config::ConfigError;
use policy_config::PolicyConversionConfig;
use tempfile::TempDir;

/// Parses a TOML string into a `PolicyConversionConfig` for tests.
pub fn config_from_toml(toml_str: &str) -> Result<PolicyConversionConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<PolicyConversionConfig, toml::de::Error> {
    config_from_toml("")
}

/// Writes a config file into a fresh temp dir and returns both.
pub fn write_config(contents: &[u8]) -> std::io::Result<(TempDir, PathBuf)> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("policy-conversion.toml");
    fs::write(&path, contents)?;
    Ok((dir, path))
}

/// Asserts that a validation result is an error containing a substring.
pub fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> Result<(), String> {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message:?} did not contain {needle:?}"))
            }
        }
        Ok(_) => Err(format!("expected error containing {needle:?}")),
    }
}
