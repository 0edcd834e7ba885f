// crates/policy-api/src/schema/versioned.rs
// ============================================================================
// Module: Versioned Policy Envelope
// Description: API version tags and the per-version policy envelope.
// Purpose: Parse and render policy documents for any served version.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A policy document names its schema through `apiVersion`. This module maps
//! that string to an [`ApiVersion`] and decodes the document into the
//! matching schema. Decoding fails closed on unknown versions and kinds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::schema::common::ObjectMeta;
use crate::schema::hub;
use crate::schema::spoke;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// API group shared by both schema versions.
pub const POLICY_GROUP: &str = "kyverno.io";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while decoding or rendering a versioned policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The document has no `apiVersion` string.
    #[error("missing apiVersion")]
    MissingApiVersion,
    /// The `apiVersion` is not a served schema version.
    #[error("unsupported apiVersion: {0}")]
    UnsupportedVersion(String),
    /// The document does not decode into the named schema.
    #[error("malformed {version} object: {message}")]
    Malformed {
        /// Version the document claimed.
        version: ApiVersion,
        /// Decoder message.
        message: String,
    },
    /// The object could not be rendered to JSON.
    #[error("failed to render object: {0}")]
    Render(String),
}

// ============================================================================
// SECTION: Versions and Kinds
// ============================================================================

/// Served schema version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ApiVersion {
    /// `kyverno.io/v1`, the hub and storage version.
    V1,
    /// `kyverno.io/v2`, the spoke.
    V2,
}

impl ApiVersion {
    /// Version used for storage.
    pub const HUB: Self = Self::V1;

    /// Every version this crate can decode.
    pub const ALL: [Self; 2] = [Self::V1, Self::V2];

    /// Parses a full `group/version` string.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let (group, version) = value.split_once('/')?;
        if group != POLICY_GROUP {
            return None;
        }
        Self::parse_short(version)
    }

    /// Parses a bare version string such as `v2`.
    #[must_use]
    pub fn parse_short(value: &str) -> Option<Self> {
        match value {
            "v1" => Some(Self::V1),
            "v2" => Some(Self::V2),
            _ => None,
        }
    }

    /// Returns the full `group/version` string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "kyverno.io/v1",
            Self::V2 => "kyverno.io/v2",
        }
    }

    /// Returns the bare version string.
    #[must_use]
    pub const fn short(self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
        }
    }

    /// Returns true for the storage version.
    #[must_use]
    pub const fn is_hub(self) -> bool {
        matches!(self, Self::V1)
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource kind of a policy object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyKind {
    /// Cluster-wide policy.
    ClusterPolicy,
    /// Namespace-scoped policy.
    Policy,
}

impl PolicyKind {
    /// Returns true for the namespace-scoped kind.
    #[must_use]
    pub const fn is_namespaced(self) -> bool {
        matches!(self, Self::Policy)
    }
}

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// A policy decoded into the schema its `apiVersion` names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionedPolicy {
    /// Hub (`v1`) object.
    Hub(hub::Policy),
    /// Spoke (`v2`) object.
    Spoke(spoke::Policy),
}

impl VersionedPolicy {
    /// Decodes a JSON document into the schema its `apiVersion` names.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when the version is missing or unsupported, or
    /// when the document does not match the schema.
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        let raw_version =
            value.get("apiVersion").and_then(Value::as_str).ok_or(SchemaError::MissingApiVersion)?;
        let version = ApiVersion::parse(raw_version)
            .ok_or_else(|| SchemaError::UnsupportedVersion(raw_version.to_string()))?;
        let malformed = |err: serde_json::Error| SchemaError::Malformed {
            version,
            message: err.to_string(),
        };
        match version {
            ApiVersion::V1 => serde_json::from_value(value).map(Self::Hub).map_err(malformed),
            ApiVersion::V2 => serde_json::from_value(value).map(Self::Spoke).map_err(malformed),
        }
    }

    /// Renders the object, including its `apiVersion`, as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Render`] when serialization fails.
    pub fn to_value(&self) -> Result<Value, SchemaError> {
        let rendered = match self {
            Self::Hub(policy) => serde_json::to_value(policy),
            Self::Spoke(policy) => serde_json::to_value(policy),
        };
        let mut value = rendered.map_err(|err| SchemaError::Render(err.to_string()))?;
        match &mut value {
            Value::Object(map) => {
                map.insert(
                    "apiVersion".to_string(),
                    Value::String(self.api_version().as_str().to_string()),
                );
                Ok(value)
            }
            _ => Err(SchemaError::Render("policy did not render as an object".to_string())),
        }
    }

    /// Returns the schema version of this object.
    #[must_use]
    pub const fn api_version(&self) -> ApiVersion {
        match self {
            Self::Hub(_) => ApiVersion::V1,
            Self::Spoke(_) => ApiVersion::V2,
        }
    }

    /// Returns the resource kind.
    #[must_use]
    pub const fn kind(&self) -> PolicyKind {
        match self {
            Self::Hub(policy) => policy.kind,
            Self::Spoke(policy) => policy.kind,
        }
    }

    /// Returns the object metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::Hub(policy) => &policy.metadata,
            Self::Spoke(policy) => &policy.metadata,
        }
    }
}

impl From<hub::Policy> for VersionedPolicy {
    fn from(policy: hub::Policy) -> Self {
        Self::Hub(policy)
    }
}

impl From<spoke::Policy> for VersionedPolicy {
    fn from(policy: spoke::Policy) -> Self {
        Self::Spoke(policy)
    }
}
