// crates/policy-conversion/src/rules.rs
// ============================================================================
// Module: Rule Converter
// Description: Spec- and policy-level composition of the field mapper.
// Purpose: Map every rule in order and route policy-level fields by rule kind.
// Dependencies: policy-api
// ============================================================================

//! ## Overview
//! Rules are mapped one by one, in input order, and never reordered,
//! deduplicated, or sorted. The rule kind is derived once per rule through
//! [`RuleKind`]:
//! - hub to spoke: the policy-level routed values are written into every
//!   rule of the matching kind;
//! - spoke to hub: the last rule of each kind supplies the policy-level value.
//!
//! Only the primary kind's field is routed per rule. A rule that combines a
//! validate block with another block carries the failure action only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use policy_api::FieldPath;
use policy_api::RoutedFields;
use policy_api::RuleKind;
use policy_api::hub;
use policy_api::spoke;

use crate::error::ConversionError;
use crate::mapper::down;
use crate::mapper::up;

// ============================================================================
// SECTION: Policies
// ============================================================================

/// Maps a hub policy to the spoke schema without side-channel handling.
///
/// # Errors
///
/// Returns [`ConversionError`] when a nested composite fails to map.
pub fn policy_to_spoke(policy: &hub::Policy) -> Result<spoke::Policy, ConversionError> {
    Ok(spoke::Policy {
        kind: policy.kind,
        metadata: policy.metadata.clone(),
        spec: spec_to_spoke(&policy.spec)?,
        status: policy.status.clone(),
    })
}

/// Maps a spoke policy to the hub schema without side-channel handling.
///
/// # Errors
///
/// Returns [`ConversionError`] when a nested composite fails to map.
pub fn policy_to_hub(policy: &spoke::Policy) -> Result<hub::Policy, ConversionError> {
    Ok(hub::Policy {
        kind: policy.kind,
        metadata: policy.metadata.clone(),
        spec: spec_to_hub(&policy.spec)?,
        status: policy.status.clone(),
    })
}

// ============================================================================
// SECTION: Specs
// ============================================================================

/// Maps a hub spec, routing policy-level values into rules by kind.
///
/// Hub-only fields (`validationFailureActionOverrides`,
/// `generateExistingOnPolicyUpdate`, `schemaValidation`) have no spoke peer
/// and are not carried.
///
/// # Errors
///
/// Returns [`ConversionError::MalformedConditions`] when a rule holds a
/// malformed raw condition block.
pub fn spec_to_spoke(spec: &hub::Spec) -> Result<spoke::Spec, ConversionError> {
    let routed = RoutedFields::from_hub(spec);
    let rules_path = FieldPath::new("spec").child("rules");
    let rules = spec
        .rules
        .iter()
        .enumerate()
        .map(|(index, rule)| {
            let mut mapped = down::rule(rule, &rules_path.index(index))?;
            routed.route_into(&mut mapped);
            Ok(mapped)
        })
        .collect::<Result<Vec<_>, ConversionError>>()?;
    Ok(spoke::Spec {
        rules,
        apply_rules: spec.apply_rules,
        failure_policy: spec.failure_policy,
        admission: spec.admission,
        background: spec.background,
        webhook_timeout_seconds: spec.webhook_timeout_seconds,
        use_server_side_apply: spec.use_server_side_apply,
        webhook_configuration: spec.webhook_configuration.clone(),
    })
}

/// Maps a spoke spec, aggregating per-rule routed values onto the policy.
///
/// # Errors
///
/// Returns [`ConversionError::Encode`] when a condition block cannot be rendered.
pub fn spec_to_hub(spec: &spoke::Spec) -> Result<hub::Spec, ConversionError> {
    let rules = spec.rules.iter().map(up::rule).collect::<Result<Vec<_>, ConversionError>>()?;
    let mut mapped = hub::Spec {
        rules,
        validation_failure_action: None,
        validation_failure_action_overrides: Vec::new(),
        apply_rules: spec.apply_rules,
        failure_policy: spec.failure_policy,
        admission: spec.admission,
        background: spec.background,
        schema_validation: None,
        webhook_timeout_seconds: spec.webhook_timeout_seconds,
        mutate_existing_on_policy_update: false,
        generate_existing: false,
        generate_existing_on_policy_update: None,
        use_server_side_apply: spec.use_server_side_apply,
        webhook_configuration: spec.webhook_configuration.clone(),
    };
    RoutedFields::from_spoke(spec).write_hub(&mut mapped);
    Ok(mapped)
}

/// Returns the rule kinds of a spoke spec, in rule order.
#[must_use]
pub fn rule_kinds(spec: &spoke::Spec) -> Vec<RuleKind> {
    spec.rules.iter().map(RuleKind::of_spoke).collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
