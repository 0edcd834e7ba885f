// crates/policy-config/src/config.rs
// ============================================================================
// Module: Policy Conversion Configuration
// Description: Configuration loading and validation for the conversion service.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: policy-api, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section validates itself; missing or invalid configuration fails
//! closed rather than falling back to permissive defaults.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use policy_api::ApiVersion;
use policy_api::BUILTIN_CLUSTER_SCOPED_KINDS;
use policy_api::StaticResourceScope;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "policy-conversion.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "POLICY_CONVERSION_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default maximum number of objects in one conversion review.
pub(crate) const DEFAULT_MAX_BATCH_OBJECTS: usize = 256;
/// Maximum allowed objects in one conversion review.
pub(crate) const MAX_BATCH_OBJECTS: usize = 4096;
/// Default maximum encoded size of a single object in bytes.
pub(crate) const DEFAULT_MAX_OBJECT_BYTES: usize = 3 * 1024 * 1024;
/// Minimum allowed per-object size limit in bytes.
pub(crate) const MIN_OBJECT_BYTES: usize = 1024;
/// Maximum allowed per-object size limit in bytes.
pub(crate) const MAX_OBJECT_BYTES: usize = 16 * 1024 * 1024;
/// Maximum number of configured cluster-scoped kinds.
pub(crate) const MAX_CLUSTER_SCOPED_KINDS: usize = 1024;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Policy conversion service configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PolicyConversionConfig {
    /// Conversion and batch limits.
    #[serde(default)]
    pub conversion: ConversionConfig,
    /// Structural validation inputs.
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Audit sink selection.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl PolicyConversionConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit path, `POLICY_CONVERSION_CONFIG`, then
    /// `policy-conversion.toml` in the working directory.
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
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration like [`Self::load`], falling back to defaults.
    ///
    /// The built-in defaults apply only when no path is given, the
    /// `POLICY_CONVERSION_CONFIG` variable is unset, and the default file is
    /// absent. A named source that cannot be read is still an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a named source fails to load or validate.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let unnamed = path.is_none() && env::var_os(CONFIG_ENV_VAR).is_none();
        if unnamed && !Path::new(DEFAULT_CONFIG_NAME).exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.conversion.validate()?;
        self.validation.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}

/// Conversion and batch limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversionConfig {
    /// Versions the service answers for, as `v1` / `v2` or full `group/version`.
    #[serde(default = "default_served_versions")]
    pub served_versions: Vec<String>,
    /// Maximum objects accepted in one review.
    #[serde(default = "default_max_batch_objects")]
    pub max_batch_objects: usize,
    /// Maximum encoded size of a single object in bytes.
    #[serde(default = "default_max_object_bytes")]
    pub max_object_bytes: usize,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            served_versions: default_served_versions(),
            max_batch_objects: DEFAULT_MAX_BATCH_OBJECTS,
            max_object_bytes: DEFAULT_MAX_OBJECT_BYTES,
        }
    }
}

impl ConversionConfig {
    /// Returns the served versions, parsed and deduplicated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an unknown version string.
    pub fn served_api_versions(&self) -> Result<Vec<ApiVersion>, ConfigError> {
        let mut versions = BTreeSet::new();
        for raw in &self.served_versions {
            let trimmed = raw.trim();
            let version = ApiVersion::parse(trimmed)
                .or_else(|| ApiVersion::parse_short(trimmed))
                .ok_or_else(|| {
                    ConfigError::Invalid(format!(
                        "conversion.served_versions contains unknown version: {trimmed}"
                    ))
                })?;
            versions.insert(version);
        }
        Ok(versions.into_iter().collect())
    }

    /// Validates conversion settings.
    fn validate(&self) -> Result<(), ConfigError> {
        let versions = self.served_api_versions()?;
        if !versions.contains(&ApiVersion::HUB) {
            return Err(ConfigError::Invalid(
                "conversion.served_versions must include the storage version v1".to_string(),
            ));
        }
        if self.max_batch_objects == 0 || self.max_batch_objects > MAX_BATCH_OBJECTS {
            return Err(ConfigError::Invalid(format!(
                "conversion.max_batch_objects must be between 1 and {MAX_BATCH_OBJECTS}"
            )));
        }
        if !(MIN_OBJECT_BYTES ..= MAX_OBJECT_BYTES).contains(&self.max_object_bytes) {
            return Err(ConfigError::Invalid(format!(
                "conversion.max_object_bytes must be between {MIN_OBJECT_BYTES} and \
                 {MAX_OBJECT_BYTES}"
            )));
        }
        Ok(())
    }
}

/// Structural validation inputs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValidationConfig {
    /// Kinds treated as cluster-scoped when validating namespaced policies.
    #[serde(default = "default_cluster_scoped_kinds")]
    pub cluster_scoped_kinds: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            cluster_scoped_kinds: default_cluster_scoped_kinds(),
        }
    }
}

impl ValidationConfig {
    /// Returns the configured resource-scope snapshot.
    #[must_use]
    pub fn resource_scope(&self) -> StaticResourceScope {
        StaticResourceScope::new(self.cluster_scoped_kinds.iter().map(|kind| kind.trim()))
    }

    /// Validates validation settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.cluster_scoped_kinds.is_empty() {
            return Err(ConfigError::Invalid(
                "validation.cluster_scoped_kinds must be non-empty".to_string(),
            ));
        }
        if self.cluster_scoped_kinds.len() > MAX_CLUSTER_SCOPED_KINDS {
            return Err(ConfigError::Invalid(format!(
                "validation.cluster_scoped_kinds exceeds {MAX_CLUSTER_SCOPED_KINDS} entries"
            )));
        }
        let mut seen = BTreeSet::new();
        for kind in &self.cluster_scoped_kinds {
            let trimmed = kind.trim();
            if trimmed.is_empty() || trimmed.contains('/') {
                return Err(ConfigError::Invalid(format!(
                    "validation.cluster_scoped_kinds contains invalid kind: {kind}"
                )));
            }
            if !seen.insert(trimmed) {
                return Err(ConfigError::Invalid(format!(
                    "validation.cluster_scoped_kinds contains duplicate kind: {trimmed}"
                )));
            }
        }
        Ok(())
    }
}

/// Audit sink selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Discard audit events.
    #[default]
    None,
    /// JSON lines on stderr.
    Stderr,
    /// JSON lines appended to a file.
    File,
}

/// Audit configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuditConfig {
    /// Sink type.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log file path for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.path is required for the file sink".to_string()))
            }
            (AuditSinkKind::File, Some(path)) => validate_path_string("audit.path", path),
            (AuditSinkKind::None | AuditSinkKind::Stderr, Some(_)) => Err(ConfigError::Invalid(
                "audit.path is only valid for the file sink".to_string(),
            )),
            (AuditSinkKind::None | AuditSinkKind::Stderr, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default served versions: both schemas.
fn default_served_versions() -> Vec<String> {
    ApiVersion::ALL.iter().map(|version| version.short().to_string()).collect()
}

/// Default batch object limit.
const fn default_max_batch_objects() -> usize {
    DEFAULT_MAX_BATCH_OBJECTS
}

/// Default per-object size limit.
const fn default_max_object_bytes() -> usize {
    DEFAULT_MAX_OBJECT_BYTES
}

/// Default cluster-scoped kinds.
fn default_cluster_scoped_kinds() -> Vec<String> {
    BUILTIN_CLUSTER_SCOPED_KINDS.iter().map(ToString::to_string).collect()
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from an explicit argument, the env var, or the default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
