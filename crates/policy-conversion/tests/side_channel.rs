// crates/policy-conversion/tests/side_channel.rs
// ============================================================================
// Module: Side-Channel Overlay Tests
// Description: Precedence between stashed data and edits made elsewhere.
// Purpose: Ensure stashed data never masks an edit made through a peer schema.
// Dependencies: policy-api, policy-conversion, serde_json
// ============================================================================
//! ## Overview
//! Stashes data through one schema, edits the object through the other, and
//! checks which values win when converting back.

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

mod common;

use policy_api::ApiVersion;
use policy_api::ValidationFailureAction;
use policy_api::VersionedPolicy;
use policy_api::hub;
use policy_api::spoke;
use policy_conversion::Converter;
use policy_conversion::SIDE_CHANNEL_ANNOTATION;
use policy_conversion::side_channel;
use serde_json::json;

/// Converts the per-rule spoke fixture to the hub.
fn stashed_hub(converter: &Converter) -> (spoke::Policy, hub::Policy) {
    let source = common::spoke_policy(common::per_rule_spoke_document());
    let hub = common::expect_hub(
        converter.convert(&VersionedPolicy::Spoke(source.clone()), ApiVersion::V1).unwrap().policy,
    );
    (source, hub)
}

// ============================================================================
// SECTION: Spoke Data Through Hub Edits
// ============================================================================

#[test]
fn spoke_only_field_survives_unrelated_hub_edit() {
    let converter = Converter::default();
    let (source, mut hub) = stashed_hub(&converter);
    hub.spec.background = Some(true);
    hub.spec.webhook_timeout_seconds = Some(20);

    let spoke = common::expect_spoke(
        converter.convert(&VersionedPolicy::Hub(hub), ApiVersion::V2).unwrap().policy,
    );
    let restored = spoke.spec.rules[0].validation.as_ref().unwrap();
    let original = source.spec.rules[0].validation.as_ref().unwrap();
    assert_eq!(
        restored.validation_failure_action_overrides,
        original.validation_failure_action_overrides
    );
    assert_eq!(spoke.spec.background, Some(true));
    assert_eq!(spoke.spec.webhook_timeout_seconds, Some(20));
    assert_eq!(spoke.spec.rules, source.spec.rules);
}

#[test]
fn edited_hub_comes_back_with_its_annotation() {
    let converter = Converter::default();
    let (_source, mut hub) = stashed_hub(&converter);
    hub.spec.background = Some(true);
    let edited = VersionedPolicy::Hub(hub);

    let down = converter.convert(&edited, ApiVersion::V2).unwrap();
    assert!(down.stashed, "the stale annotation has to travel with the spoke");
    let up = converter.convert(&down.policy, ApiVersion::V1).unwrap();
    assert!(up.restored);
    assert_eq!(up.policy, edited);
}

#[test]
fn hub_edit_of_routed_field_wins_over_stash() {
    let converter = Converter::default();
    let (source, mut hub) = stashed_hub(&converter);
    hub.spec.validation_failure_action = Some(ValidationFailureAction::Enforce);

    let spoke = common::expect_spoke(
        converter.convert(&VersionedPolicy::Hub(hub), ApiVersion::V2).unwrap().policy,
    );
    for rule in &spoke.spec.rules {
        if let Some(validation) = &rule.validation {
            assert_eq!(validation.validation_failure_action, Some(ValidationFailureAction::Enforce));
        }
    }
    let overrides = &spoke.spec.rules[0].validation.as_ref().unwrap().validation_failure_action_overrides;
    let original = &source.spec.rules[0].validation.as_ref().unwrap().validation_failure_action_overrides;
    assert_eq!(overrides, original, "fields without a hub peer still come from the stash");
}

#[test]
fn restored_rules_follow_names_after_reorder() {
    let converter = Converter::default();
    let (source, mut hub) = stashed_hub(&converter);
    hub.spec.rules.reverse();

    let spoke = common::expect_spoke(
        converter.convert(&VersionedPolicy::Hub(hub), ApiVersion::V2).unwrap().policy,
    );
    let names: Vec<&str> = spoke.spec.rules.iter().map(|rule| rule.name.as_str()).collect();
    assert_eq!(names, vec!["seed-config", "require-owner", "no-latest"]);
    let no_latest = spoke.spec.rules[2].validation.as_ref().unwrap();
    let original = source.spec.rules[0].validation.as_ref().unwrap();
    assert_eq!(
        no_latest.validation_failure_action_overrides,
        original.validation_failure_action_overrides
    );
}

/// Spoke with two validate rules whose actions differ; the hub keeps the last.
fn split_action_spoke() -> spoke::Policy {
    common::spoke_policy(json!({
        "apiVersion": "kyverno.io/v2",
        "kind": "ClusterPolicy",
        "metadata": {"name": "split-actions"},
        "spec": {
            "rules": [
                {
                    "name": "strict",
                    "match": {"any": [{"resources": {"kinds": ["Pod"]}}]},
                    "validate": {"validationFailureAction": "Enforce", "message": "a", "pattern": {"a": "b"}}
                },
                {
                    "name": "lenient",
                    "match": {"any": [{"resources": {"kinds": ["Pod"]}}]},
                    "validate": {"validationFailureAction": "Audit", "message": "b", "pattern": {"c": "d"}}
                }
            ]
        }
    }))
}

fn failure_actions(spoke: &spoke::Policy) -> Vec<Option<ValidationFailureAction>> {
    spoke
        .spec
        .rules
        .iter()
        .map(|rule| rule.validation.as_ref().and_then(|block| block.validation_failure_action))
        .collect()
}

#[test]
fn dropping_the_last_rule_of_a_kind_keeps_the_hub_action() {
    let converter = Converter::default();
    let mut hub = common::expect_hub(
        converter.convert(&VersionedPolicy::Spoke(split_action_spoke()), ApiVersion::V1).unwrap().policy,
    );
    assert_eq!(hub.spec.validation_failure_action, Some(ValidationFailureAction::Audit));
    assert!(hub.metadata.annotations.contains_key(SIDE_CHANNEL_ANNOTATION));
    hub.spec.rules.pop();
    let edited = VersionedPolicy::Hub(hub);

    let down = converter.convert(&edited, ApiVersion::V2).unwrap().policy;
    let spoke = common::expect_spoke(down.clone());
    assert_eq!(failure_actions(&spoke), vec![Some(ValidationFailureAction::Audit)]);
    let up = converter.convert(&down, ApiVersion::V1).unwrap().policy;
    assert_eq!(up, edited);
}

#[test]
fn reordering_rules_keeps_the_hub_action() {
    let converter = Converter::default();
    let mut hub = common::expect_hub(
        converter.convert(&VersionedPolicy::Spoke(split_action_spoke()), ApiVersion::V1).unwrap().policy,
    );
    hub.spec.rules.reverse();
    let edited = VersionedPolicy::Hub(hub);

    let down = converter.convert(&edited, ApiVersion::V2).unwrap().policy;
    let spoke = common::expect_spoke(down.clone());
    assert_eq!(
        failure_actions(&spoke),
        vec![Some(ValidationFailureAction::Audit), Some(ValidationFailureAction::Audit)]
    );
    let up = converter.convert(&down, ApiVersion::V1).unwrap().policy;
    assert_eq!(up, edited);
}

#[test]
fn unedited_hub_restores_per_rule_actions() {
    let converter = Converter::default();
    let source = split_action_spoke();
    let hub = converter.convert(&VersionedPolicy::Spoke(source.clone()), ApiVersion::V1).unwrap();
    let down = converter.convert(&hub.policy, ApiVersion::V2).unwrap();
    assert!(!down.stashed);
    assert_eq!(common::expect_spoke(down.policy), source);
}

// ============================================================================
// SECTION: Hub Data Through Spoke Edits
// ============================================================================

#[test]
fn spoke_edit_of_match_block_wins_over_stash() {
    let converter = Converter::default();
    let source = common::hub_policy(common::legacy_hub_document());
    let mut spoke = common::expect_spoke(
        converter.convert(&VersionedPolicy::Hub(source.clone()), ApiVersion::V2).unwrap().policy,
    );
    spoke.spec.rules[0].match_resources.any[0].resources.kinds.push("Deployment".to_string());

    let hub = common::expect_hub(
        converter.convert(&VersionedPolicy::Spoke(spoke), ApiVersion::V1).unwrap().policy,
    );
    let edited = &hub.spec.rules[0];
    assert!(!edited.match_resources.has_inline_filter());
    assert_eq!(edited.match_resources.any[0].resources.kinds, vec!["Pod", "Deployment"]);
    assert_eq!(edited.preconditions, source.spec.rules[0].preconditions, "untouched units restore");
    assert_eq!(edited.validation, source.spec.rules[0].validation);
    assert_eq!(
        hub.spec.validation_failure_action_overrides,
        source.spec.validation_failure_action_overrides
    );
    assert_eq!(hub.spec.schema_validation, Some(false));
    assert_eq!(hub.spec.rules[3], source.spec.rules[3]);
}

// ============================================================================
// SECTION: Explicit Payloads
// ============================================================================

#[test]
fn explicit_payload_pairs_can_be_constructed() {
    let converter = Converter::default();
    let mut hub = common::hub_policy(common::lossless_hub_document());
    let mut stashed_spec = common::spoke_policy(common::per_rule_spoke_document()).spec;
    stashed_spec.rules.truncate(1);
    stashed_spec.rules[0].name = "check".to_string();
    side_channel::stash(&mut hub.metadata, ApiVersion::V2, hub.kind, &stashed_spec).unwrap();

    let conversion = converter.convert(&VersionedPolicy::Hub(hub), ApiVersion::V2).unwrap();
    assert!(conversion.restored);
    let spoke = common::expect_spoke(conversion.policy);
    let validation = spoke.spec.rules[0].validation.as_ref().unwrap();
    assert_eq!(validation.validation_failure_action_overrides.len(), 1);
    assert_eq!(
        validation.validation_failure_action,
        Some(ValidationFailureAction::Audit),
        "the stash disagrees with the hub, so the hub value wins"
    );
    assert_eq!(validation.message, "m");
}

#[test]
fn payload_for_the_source_version_is_carried_back_unread() {
    let converter = Converter::default();
    let mut hub = common::hub_policy(common::lossless_hub_document());
    let spec = hub.spec.clone();
    side_channel::stash(&mut hub.metadata, ApiVersion::V1, hub.kind, &spec).unwrap();
    let source = VersionedPolicy::Hub(hub);

    let down = converter.convert(&source, ApiVersion::V2).unwrap();
    assert!(!down.restored, "a hub payload is not read when leaving the hub");
    assert!(down.stashed, "the unread annotation travels with the spoke");
    let up = converter.convert(&down.policy, ApiVersion::V1).unwrap();
    assert_eq!(up.policy, source);
}

#[test]
fn tampered_hub_payload_fails_the_conversion() {
    let converter = Converter::default();
    let mut spoke = common::spoke_policy(common::per_rule_spoke_document());
    let mut stashed = common::hub_policy(common::lossless_hub_document()).spec;
    stashed.rules[0].preconditions = Some(json!("oops"));
    side_channel::stash(&mut spoke.metadata, ApiVersion::V1, spoke.kind, &stashed).unwrap();
    let error = converter.convert(&VersionedPolicy::Spoke(spoke), ApiVersion::V1).unwrap_err();
    assert_eq!(error.kind(), "malformed_payload");
}

#[test]
fn malformed_payload_fails_the_conversion() {
    let converter = Converter::default();
    let mut hub = common::hub_policy(common::lossless_hub_document());
    hub.metadata
        .annotations
        .insert(SIDE_CHANNEL_ANNOTATION.to_string(), "{\"apiVersion\":".to_string());
    let error = converter.convert(&VersionedPolicy::Hub(hub), ApiVersion::V2).unwrap_err();
    assert_eq!(error.kind(), "malformed_payload");
}
