// crates/policy-conversion/src/side_channel.rs
// ============================================================================
// Module: Side-Channel Store
// Description: Stash, restore, and overlay of data the peer schema cannot hold.
// Purpose: Let an object survive a round trip through a narrower schema.
// Dependencies: policy-api, serde, serde_jcs, serde_json
// ============================================================================

//! ## Overview
//! A stashed payload is the canonical JSON (RFC 8785) of
//! `{apiVersion, kind, spec}` for the object being converted, attached under
//! the reserved [`SIDE_CHANNEL_ANNOTATION`]. Identity and lifecycle metadata
//! are never stashed. Other code paths must treat the annotation as opaque.
//!
//! The payload is an explicit value: [`encode_payload`] and
//! [`decode_payload`] work on strings, and [`stash`] / [`restore`] only move
//! that string in and out of object metadata. A hub payload may also carry,
//! verbatim, the annotation the hub object itself held, so the hub comes
//! back byte for byte.
//!
//! Overlay rules, applied to a freshly mapped object:
//! - fields with no peer are restored when the stash holds a non-empty value;
//! - routed fields are restored only while the source's peer values still
//!   match what the stash maps to, and only when the restored rules
//!   aggregate back to those values, so edits made through the source win;
//! - composite rule units whose shape differs between schemas are restored
//!   only when mapping the stashed unit reproduces the source unit exactly.
//!
//! Rules are paired by index when names agree, otherwise by name.

// ============================================================================
// SECTION: Imports
// ============================================================================

use policy_api::ApiVersion;
use policy_api::FieldPath;
use policy_api::ObjectMeta;
use policy_api::PolicyKind;
use policy_api::RoutedFields;
use policy_api::hub;
use policy_api::spoke;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ConversionError;
use crate::mapper::conditions;
use crate::mapper::down;
use crate::rules;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Reserved metadata annotation holding the stashed payload.
pub const SIDE_CHANNEL_ANNOTATION: &str = "kyverno.io/conversion-data";

// ============================================================================
// SECTION: Payload
// ============================================================================

/// Serialized payload layout.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PayloadRef<'a, S> {
    /// Schema version of the stashed spec.
    api_version: &'static str,
    /// Resource kind of the stashed object.
    kind: PolicyKind,
    /// Stashed spec.
    spec: &'a S,
    /// Side-channel annotation the stashed object itself carried.
    #[serde(skip_serializing_if = "Option::is_none")]
    source_annotation: Option<&'a str>,
}

/// Decoded payload contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stashed<S> {
    /// Stashed spec.
    pub spec: S,
    /// Side-channel annotation the stashed object itself carried, verbatim.
    pub source_annotation: Option<String>,
}

/// Encodes a spec as a canonical JSON payload.
///
/// # Errors
///
/// Returns [`ConversionError::Encode`] when canonicalization fails.
pub fn encode_payload<S: Serialize>(
    version: ApiVersion,
    kind: PolicyKind,
    spec: &S,
) -> Result<String, ConversionError> {
    encode_stashed(version, kind, spec, None)
}

/// Encodes a spec together with the annotation its object carried.
///
/// # Errors
///
/// Returns [`ConversionError::Encode`] when canonicalization fails.
pub fn encode_stashed<S: Serialize>(
    version: ApiVersion,
    kind: PolicyKind,
    spec: &S,
    source_annotation: Option<&str>,
) -> Result<String, ConversionError> {
    let payload = PayloadRef {
        api_version: version.as_str(),
        kind,
        spec,
        source_annotation,
    };
    serde_jcs::to_string(&payload).map_err(|err| ConversionError::Encode(err.to_string()))
}

/// Decodes the spec of a payload stashed for `expected`.
///
/// A payload stashed for another version is not an error; it yields `None`
/// because it holds nothing the requested schema can use.
///
/// # Errors
///
/// Returns [`ConversionError::MalformedPayload`] when the payload is not a
/// JSON object with an `apiVersion` and a `spec` of the expected schema.
pub fn decode_payload<S: DeserializeOwned>(
    payload: &str,
    expected: ApiVersion,
) -> Result<Option<S>, ConversionError> {
    Ok(decode_stashed(payload, expected)?.map(|stashed| stashed.spec))
}

/// Decodes a payload stashed for `expected`, including any carried annotation.
///
/// # Errors
///
/// Returns [`ConversionError::MalformedPayload`] as [`decode_payload`], or
/// when a carried annotation is not a string.
pub fn decode_stashed<S: DeserializeOwned>(
    payload: &str,
    expected: ApiVersion,
) -> Result<Option<Stashed<S>>, ConversionError> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|err| ConversionError::MalformedPayload(err.to_string()))?;
    let Value::Object(mut map) = value else {
        return Err(ConversionError::MalformedPayload("payload is not an object".to_string()));
    };
    let version = map
        .get("apiVersion")
        .and_then(Value::as_str)
        .ok_or_else(|| ConversionError::MalformedPayload("payload has no apiVersion".to_string()))?;
    if version != expected.as_str() {
        return Ok(None);
    }
    let source_annotation = match map.remove("sourceAnnotation") {
        None => None,
        Some(Value::String(annotation)) => Some(annotation),
        Some(_) => {
            return Err(ConversionError::MalformedPayload(
                "payload sourceAnnotation is not a string".to_string(),
            ));
        }
    };
    let spec = map
        .remove("spec")
        .ok_or_else(|| ConversionError::MalformedPayload("payload has no spec".to_string()))?;
    let spec =
        serde_json::from_value(spec).map_err(|err| ConversionError::MalformedPayload(err.to_string()))?;
    Ok(Some(Stashed {
        spec,
        source_annotation,
    }))
}

// ============================================================================
// SECTION: Stash and Restore
// ============================================================================

/// Encodes `spec` and attaches it to `metadata`, replacing any earlier payload.
///
/// # Errors
///
/// Returns [`ConversionError::Encode`] when canonicalization fails.
pub fn stash<S: Serialize>(
    metadata: &mut ObjectMeta,
    version: ApiVersion,
    kind: PolicyKind,
    spec: &S,
) -> Result<(), ConversionError> {
    stash_carrying(metadata, version, kind, spec, None)
}

/// Like [`stash`], also carrying the annotation the stashed object held.
///
/// # Errors
///
/// Returns [`ConversionError::Encode`] when canonicalization fails.
pub fn stash_carrying<S: Serialize>(
    metadata: &mut ObjectMeta,
    version: ApiVersion,
    kind: PolicyKind,
    spec: &S,
    source_annotation: Option<&str>,
) -> Result<(), ConversionError> {
    let payload = encode_stashed(version, kind, spec, source_annotation)?;
    metadata.annotations.insert(SIDE_CHANNEL_ANNOTATION.to_string(), payload);
    Ok(())
}

/// Detaches the payload from `metadata` and decodes its spec for `expected`.
///
/// The annotation is always removed. A missing annotation is `Ok(None)`.
///
/// # Errors
///
/// Returns [`ConversionError::MalformedPayload`] as [`decode_payload`].
pub fn restore<S: DeserializeOwned>(
    metadata: &mut ObjectMeta,
    expected: ApiVersion,
) -> Result<Option<S>, ConversionError> {
    Ok(restore_stashed(metadata, expected)?.map(|stashed| stashed.spec))
}

/// Detaches the payload from `metadata` and decodes it for `expected`.
///
/// # Errors
///
/// Returns [`ConversionError::MalformedPayload`] as [`decode_stashed`].
pub fn restore_stashed<S: DeserializeOwned>(
    metadata: &mut ObjectMeta,
    expected: ApiVersion,
) -> Result<Option<Stashed<S>>, ConversionError> {
    match metadata.annotations.remove(SIDE_CHANNEL_ANNOTATION) {
        Some(payload) => decode_stashed(&payload, expected),
        None => Ok(None),
    }
}

// ============================================================================
// SECTION: Overlay
// ============================================================================

/// Overlays a stashed spoke spec onto a spec freshly mapped from `source`.
///
/// Spoke-only fields are restored rule by rule. Routed values are restored
/// all together or not at all, and only when the restored rules still
/// aggregate to the routed values `source` holds.
pub fn overlay_spoke(restored: &spoke::Spec, fresh: &mut spoke::Spec, source: &hub::Spec) {
    let names: Vec<&str> = restored.rules.iter().map(|rule| rule.name.as_str()).collect();
    let pairs: Vec<Option<&spoke::Rule>> = fresh
        .rules
        .iter()
        .enumerate()
        .map(|(index, rule)| {
            counterpart(&names, index, &rule.name).and_then(|at| restored.rules.get(at))
        })
        .collect();
    for (rule, saved) in fresh.rules.iter_mut().zip(&pairs) {
        if let Some(saved) = saved {
            restore_spoke_only(saved, rule);
        }
    }

    let routed = RoutedFields::from_hub(source);
    if RoutedFields::from_spoke(restored) != routed {
        return;
    }
    let mut candidate = fresh.rules.clone();
    for (rule, saved) in candidate.iter_mut().zip(&pairs) {
        if let Some(saved) = saved {
            restore_routed(saved, rule);
        }
    }
    if RoutedFields::from_spoke_rules(&candidate) == routed {
        fresh.rules = candidate;
    }
}

/// Overlays a stashed hub spec onto a spec freshly mapped from `source`.
///
/// # Errors
///
/// Returns [`ConversionError::MalformedPayload`] when the stashed spec does
/// not map to the spoke schema.
pub fn overlay_hub(
    restored: &hub::Spec,
    fresh: &mut hub::Spec,
    source: &spoke::Spec,
) -> Result<(), ConversionError> {
    let remapped = rules::spec_to_spoke(restored).map_err(payload_error)?;
    if !restored.validation_failure_action_overrides.is_empty() {
        fresh.validation_failure_action_overrides =
            restored.validation_failure_action_overrides.clone();
    }
    if restored.generate_existing_on_policy_update.is_some() {
        fresh.generate_existing_on_policy_update = restored.generate_existing_on_policy_update;
    }
    if restored.schema_validation.is_some() {
        fresh.schema_validation = restored.schema_validation;
    }
    if per_rule_routed(&remapped) == per_rule_routed(source) {
        RoutedFields::from_hub(restored).write_hub(fresh);
    }

    let rules_path = FieldPath::new("spec").child("rules");
    let names: Vec<&str> = restored.rules.iter().map(|rule| rule.name.as_str()).collect();
    for (index, rule) in fresh.rules.iter_mut().enumerate() {
        let Some(current) = source.rules.get(index) else {
            continue;
        };
        let Some(at) = counterpart(&names, index, &rule.name) else {
            continue;
        };
        let Some(saved) = restored.rules.get(at) else {
            continue;
        };
        restore_hub_rule_units(saved, rule, current, &rules_path.index(at))?;
    }
    Ok(())
}

/// Restores the spoke-only fields of one rule.
fn restore_spoke_only(saved: &spoke::Rule, rule: &mut spoke::Rule) {
    if let Some(target) = rule.validation.as_mut()
        && let Some(stashed) = saved.validation.as_ref()
        && !stashed.validation_failure_action_overrides.is_empty()
    {
        target.validation_failure_action_overrides =
            stashed.validation_failure_action_overrides.clone();
    }
}

/// Restores the routed per-rule values of one rule.
fn restore_routed(saved: &spoke::Rule, rule: &mut spoke::Rule) {
    if let Some(target) = rule.validation.as_mut()
        && let Some(stashed) = saved.validation.as_ref()
    {
        target.validation_failure_action = stashed.validation_failure_action;
    }
    if let Some(target) = rule.mutation.as_mut()
        && let Some(stashed) = saved.mutation.as_ref()
    {
        target.mutate_existing_on_policy_update = stashed.mutate_existing_on_policy_update;
    }
    if let Some(target) = rule.generation.as_mut()
        && let Some(stashed) = saved.generation.as_ref()
    {
        target.generate_existing = stashed.generate_existing;
    }
}

/// Restores each composite unit of a hub rule the source did not change.
fn restore_hub_rule_units(
    saved: &hub::Rule,
    rule: &mut hub::Rule,
    current: &spoke::Rule,
    path: &FieldPath,
) -> Result<(), ConversionError> {
    if down::match_resources(&saved.match_resources) == current.match_resources {
        rule.match_resources = saved.match_resources.clone();
    }
    if saved.exclude.as_ref().map(down::match_resources) == current.exclude {
        rule.exclude = saved.exclude.clone();
    }
    let preconditions =
        conditions::parse_optional(saved.preconditions.as_ref(), &path.child("preconditions"))
            .map_err(payload_error)?;
    if preconditions == current.preconditions {
        rule.preconditions = saved.preconditions.clone();
    }
    let validation = saved
        .validation
        .as_ref()
        .map(|block| down::validation(block, &path.child("validate")))
        .transpose()
        .map_err(payload_error)?;
    if validation == current.validation.as_ref().map(without_routed_validation) {
        rule.validation = saved.validation.clone();
    }
    let mutation = saved
        .mutation
        .as_ref()
        .map(|block| down::mutation(block, &path.child("mutate")))
        .transpose()
        .map_err(payload_error)?;
    if mutation == current.mutation.as_ref().map(without_routed_mutation) {
        rule.mutation = saved.mutation.clone();
    }
    if saved.generation.as_ref().map(down::generation)
        == current.generation.as_ref().map(without_routed_generation)
    {
        rule.generation = saved.generation.clone();
    }
    let images: Vec<spoke::ImageVerification> =
        saved.verify_images.iter().map(down::image_verification).collect();
    if images == current.verify_images {
        rule.verify_images = saved.verify_images.clone();
    }
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Finds the stashed rule paired with fresh rule `index` named `name`.
fn counterpart(names: &[&str], index: usize, name: &str) -> Option<usize> {
    if names.get(index).is_some_and(|candidate| *candidate == name) {
        return Some(index);
    }
    names.iter().position(|candidate| *candidate == name)
}

/// Reports a failure on stashed data as a malformed payload.
pub(crate) fn payload_error(err: ConversionError) -> ConversionError {
    match err {
        ConversionError::MalformedPayload(_) => err,
        other => ConversionError::MalformedPayload(other.to_string()),
    }
}

/// Routed values exactly as each spoke rule holds them.
fn per_rule_routed(spec: &spoke::Spec) -> Vec<RoutedFields> {
    spec.rules
        .iter()
        .map(|rule| RoutedFields {
            validation_failure_action: rule
                .validation
                .as_ref()
                .and_then(|block| block.validation_failure_action),
            mutate_existing_on_policy_update: rule
                .mutation
                .as_ref()
                .is_some_and(|block| block.mutate_existing_on_policy_update),
            generate_existing: rule.generation.as_ref().is_some_and(|block| block.generate_existing),
        })
        .collect()
}

/// Spoke validation block with its routed and spoke-only fields cleared.
fn without_routed_validation(block: &spoke::Validation) -> spoke::Validation {
    spoke::Validation {
        validation_failure_action: None,
        validation_failure_action_overrides: Vec::new(),
        ..block.clone()
    }
}

/// Spoke mutation block with its routed field cleared.
fn without_routed_mutation(block: &spoke::Mutation) -> spoke::Mutation {
    spoke::Mutation {
        mutate_existing_on_policy_update: false,
        ..block.clone()
    }
}

/// Spoke generation block with its routed field cleared.
fn without_routed_generation(block: &spoke::Generation) -> spoke::Generation {
    spoke::Generation {
        generate_existing: false,
        ..block.clone()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
