// crates/policy-conversion/src/director.rs
// ============================================================================
// Module: Conversion Director
// Description: Whole-object conversion between served schema versions.
// Purpose: Run the rule converter, then restore and stash side-channel data.
// Dependencies: policy-api, policy-config, serde_json
// ============================================================================

//! ## Overview
//! [`Converter::convert`] is a pure function of its inputs: no I/O, no
//! retries, no partial output. Each direction runs the same steps:
//! 1. detach the side-channel payload from the source metadata;
//! 2. map the spec through the rule converter;
//! 3. overlay whatever the payload holds for the target schema;
//! 4. map the result back and, if that no longer reproduces the source,
//!    stash the source spec on the result.
//!
//! Objects that convert losslessly never carry the annotation. A hub edited
//! since its annotation was written still comes back exactly: its stash
//! carries the old annotation along.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use policy_api::ApiVersion;
use policy_api::ObjectMeta;
use policy_api::VersionedPolicy;
use policy_api::hub;
use policy_api::spoke;
use policy_config::ConfigError;
use policy_config::ConversionConfig;
use serde_json::Value;

use crate::error::ConversionError;
use crate::rules;
use crate::side_channel;
use crate::side_channel::SIDE_CHANNEL_ANNOTATION;
use crate::side_channel::Stashed;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Result of one object conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    /// Converted object.
    pub policy: VersionedPolicy,
    /// A side-channel payload for the target schema was applied.
    pub restored: bool,
    /// The source spec was stashed on the converted object.
    pub stashed: bool,
}

impl Conversion {
    /// Wraps an object that needed no conversion.
    const fn unchanged(policy: VersionedPolicy) -> Self {
        Self {
            policy,
            restored: false,
            stashed: false,
        }
    }
}

/// Converts policies between the versions it serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converter {
    /// Served schema versions.
    served: BTreeSet<ApiVersion>,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ApiVersion::ALL)
    }
}

impl Converter {
    /// Creates a converter serving the given versions.
    #[must_use]
    pub fn new<I>(served: I) -> Self
    where
        I: IntoIterator<Item = ApiVersion>,
    {
        Self {
            served: served.into_iter().collect(),
        }
    }

    /// Creates a converter from the conversion config section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unknown served versions.
    pub fn from_config(config: &ConversionConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.served_api_versions()?))
    }

    /// Returns true when `version` is served.
    #[must_use]
    pub fn is_served(&self, version: ApiVersion) -> bool {
        self.served.contains(&version)
    }

    /// Returns the served versions in order.
    pub fn served_versions(&self) -> impl Iterator<Item = ApiVersion> + '_ {
        self.served.iter().copied()
    }

    /// Resolves a full `group/version` string to a served version.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::UnsupportedVersion`] when the string is
    /// unknown or the version is not served.
    pub fn resolve(&self, api_version: &str) -> Result<ApiVersion, ConversionError> {
        ApiVersion::parse(api_version)
            .filter(|version| self.is_served(*version))
            .ok_or_else(|| ConversionError::UnsupportedVersion(api_version.to_string()))
    }

    /// Converts `source` to `desired`.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError`] when either version is not served or a
    /// nested composite fails to convert.
    pub fn convert(
        &self,
        source: &VersionedPolicy,
        desired: ApiVersion,
    ) -> Result<Conversion, ConversionError> {
        for version in [source.api_version(), desired] {
            if !self.is_served(version) {
                return Err(ConversionError::UnsupportedVersion(version.as_str().to_string()));
            }
        }
        match (source, desired) {
            (VersionedPolicy::Hub(_), ApiVersion::V1) | (VersionedPolicy::Spoke(_), ApiVersion::V2) => {
                Ok(Conversion::unchanged(source.clone()))
            }
            (VersionedPolicy::Hub(policy), ApiVersion::V2) => hub_to_spoke(policy),
            (VersionedPolicy::Spoke(policy), ApiVersion::V1) => spoke_to_hub(policy),
        }
    }

    /// Decodes a JSON document and converts it to `desired`.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError`] when the document does not decode, a
    /// version is not served, or conversion fails.
    pub fn convert_value(&self, source: Value, desired: &str) -> Result<Conversion, ConversionError> {
        let desired = self.resolve(desired)?;
        let source = VersionedPolicy::from_value(source)?;
        self.convert(&source, desired)
    }
}

// ============================================================================
// SECTION: Directions
// ============================================================================

/// Converts a hub object to the spoke schema.
///
/// The hub spec is stashed whenever converting the result back, with nothing
/// stashed, would not reproduce `policy` exactly. That payload also carries
/// the side-channel annotation `policy` held.
///
/// # Errors
///
/// Returns [`ConversionError`] for malformed conditions or payloads.
pub fn hub_to_spoke(policy: &hub::Policy) -> Result<Conversion, ConversionError> {
    let mut metadata = policy.metadata.clone();
    let restored: Option<spoke::Spec> = side_channel::restore(&mut metadata, ApiVersion::V2)?;
    let mut spec = rules::spec_to_spoke(&policy.spec)?;
    if let Some(saved) = &restored {
        side_channel::overlay_spoke(saved, &mut spec, &policy.spec);
    }
    let mut converted = spoke::Policy {
        kind: policy.kind,
        metadata,
        spec,
        status: policy.status.clone(),
    };
    let stashed = match spoke_to_hub(&converted)?.policy {
        VersionedPolicy::Hub(plain) => plain != *policy,
        VersionedPolicy::Spoke(_) => true,
    };
    if stashed {
        let carried = policy.metadata.annotations.get(SIDE_CHANNEL_ANNOTATION);
        side_channel::stash_carrying(
            &mut converted.metadata,
            ApiVersion::V1,
            policy.kind,
            &policy.spec,
            carried.map(String::as_str),
        )?;
    }
    Ok(Conversion {
        policy: VersionedPolicy::Spoke(converted),
        restored: restored.is_some(),
        stashed,
    })
}

/// Converts a spoke object to the hub schema.
///
/// A spoke that is exactly what its stashed hub converts to yields that hub
/// unchanged, its own annotation included.
///
/// # Errors
///
/// Returns [`ConversionError`] for malformed payloads or unrenderable conditions.
pub fn spoke_to_hub(policy: &spoke::Policy) -> Result<Conversion, ConversionError> {
    let mut metadata = policy.metadata.clone();
    let restored: Option<Stashed<hub::Spec>> =
        side_channel::restore_stashed(&mut metadata, ApiVersion::V1)?;
    if let Some(saved) = &restored
        && let Some(original) = unedited_hub(policy, &metadata, saved)?
    {
        return Ok(Conversion {
            policy: VersionedPolicy::Hub(original),
            restored: true,
            stashed: false,
        });
    }
    let mut spec = rules::spec_to_hub(&policy.spec)?;
    if let Some(saved) = &restored {
        side_channel::overlay_hub(&saved.spec, &mut spec, &policy.spec)?;
    }
    let stashed = rules::spec_to_spoke(&spec)? != policy.spec;
    if stashed {
        side_channel::stash(&mut metadata, ApiVersion::V2, policy.kind, &policy.spec)?;
    }
    Ok(Conversion {
        policy: VersionedPolicy::Hub(hub::Policy {
            kind: policy.kind,
            metadata,
            spec,
            status: policy.status.clone(),
        }),
        restored: restored.is_some(),
        stashed,
    })
}

/// Returns the stashed hub when `policy` is exactly its spoke conversion.
fn unedited_hub(
    policy: &spoke::Policy,
    metadata: &ObjectMeta,
    saved: &Stashed<hub::Spec>,
) -> Result<Option<hub::Policy>, ConversionError> {
    let mut original = hub::Policy {
        kind: policy.kind,
        metadata: metadata.clone(),
        spec: saved.spec.clone(),
        status: policy.status.clone(),
    };
    if let Some(annotation) = &saved.source_annotation {
        original
            .metadata
            .annotations
            .insert(SIDE_CHANNEL_ANNOTATION.to_string(), annotation.clone());
    }
    let converted = hub_to_spoke(&original).map_err(side_channel::payload_error)?;
    let unedited = match converted.policy {
        VersionedPolicy::Spoke(converted) => converted == *policy,
        VersionedPolicy::Hub(_) => false,
    };
    Ok(unedited.then_some(original))
}
