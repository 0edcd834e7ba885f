// crates/policy-conversion/tests/round_trip.rs
// ============================================================================
// Module: Round Trip Tests
// Description: Hub-total and spoke-safe round trips over realistic policies.
// Purpose: Ensure conversion never loses operator intent in either direction.
// Dependencies: policy-api, policy-conversion, serde_json
// ============================================================================
//! ## Overview
//! Converts legacy hub policies and per-rule spoke policies through the peer
//! schema and back, and checks how legacy fields surface in the spoke.

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
use policy_api::ImageVerificationType;
use policy_api::ValidationFailureAction;
use policy_api::VersionedPolicy;
use policy_conversion::Converter;
use policy_conversion::SIDE_CHANNEL_ANNOTATION;

// ============================================================================
// SECTION: Hub Total
// ============================================================================

#[test]
fn legacy_hub_round_trips_exactly() {
    let converter = Converter::default();
    let source = VersionedPolicy::Hub(common::hub_policy(common::legacy_hub_document()));
    let down = converter.convert(&source, ApiVersion::V2).unwrap();
    assert!(down.stashed);
    assert!(!down.restored);
    let up = converter.convert(&down.policy, ApiVersion::V1).unwrap();
    assert!(up.restored);
    assert!(!up.stashed);
    assert_eq!(up.policy, source);
}

#[test]
fn legacy_fields_surface_in_spoke_form() {
    let converter = Converter::default();
    let source = VersionedPolicy::Hub(common::hub_policy(common::legacy_hub_document()));
    let spoke = common::expect_spoke(converter.convert(&source, ApiVersion::V2).unwrap().policy);

    let first = &spoke.spec.rules[0];
    assert!(first.match_resources.all.is_empty());
    assert_eq!(first.match_resources.any.len(), 1);
    let inline = &first.match_resources.any[0];
    assert_eq!(inline.user_info.roles, vec!["dev:editor".to_string()]);
    assert_eq!(inline.resources.kinds, vec!["Pod".to_string()]);
    assert_eq!(inline.resources.names, vec!["web".to_string()]);
    assert_eq!(first.preconditions.as_ref().unwrap().any.len(), 1);
    let validation = first.validation.as_ref().unwrap();
    assert_eq!(validation.validation_failure_action, Some(ValidationFailureAction::Enforce));
    assert!(validation.validation_failure_action_overrides.is_empty());
    assert_eq!(validation.deny.as_ref().unwrap().conditions.as_ref().unwrap().any.len(), 1);

    assert!(spoke.spec.rules[1].mutation.as_ref().unwrap().mutate_existing_on_policy_update);
    assert!(!spoke.spec.rules[2].generation.as_ref().unwrap().generate_existing);

    let image = &spoke.spec.rules[3].verify_images[0];
    assert_eq!(image.image_references, vec!["ghcr.io/acme/*".to_string()]);
    assert_eq!(image.attestors.len(), 1);
    let entry = &image.attestors[0].entries[0];
    assert!(entry.keys.as_ref().unwrap().public_keys.starts_with("-----BEGIN PUBLIC KEY-----"));
    assert!(entry.keyless.is_none());
    assert_eq!(entry.annotations.get("env").map(String::as_str), Some("prod"));
    assert_eq!(image.attestations[0].attestation_type, "https://slsa.dev/provenance/v0.2");
    assert_eq!(image.verification_type, None::<ImageVerificationType>);
    assert!(!image.mutate_digest);

    assert!(spoke.metadata.annotations.contains_key(SIDE_CHANNEL_ANNOTATION));
    assert_eq!(spoke.metadata.uid.as_deref(), Some("6d1c2c4e-0000-4000-8000-000000000001"));
    assert_eq!(spoke.metadata.resource_version.as_deref(), Some("42"));
}

#[test]
fn inline_filter_joins_all_when_all_is_populated() {
    let converter = Converter::default();
    let mut document = common::lossless_hub_document();
    document["spec"]["rules"][0]["match"] = serde_json::json!({
        "all": [{"resources": {"kinds": ["Pod"]}}],
        "subjects": [{"kind": "User", "name": "alice"}]
    });
    let source = VersionedPolicy::Hub(common::hub_policy(document));
    let spoke = common::expect_spoke(converter.convert(&source, ApiVersion::V2).unwrap().policy);
    let block = &spoke.spec.rules[0].match_resources;
    assert!(block.any.is_empty());
    assert_eq!(block.all.len(), 2);
    assert_eq!(block.all[1].user_info.subjects[0].name, "alice");

    let back = converter.convert(&VersionedPolicy::Spoke(spoke), ApiVersion::V1).unwrap();
    assert_eq!(back.policy, source);
}

#[test]
fn lossless_hub_carries_no_annotation() {
    let converter = Converter::default();
    let source = VersionedPolicy::Hub(common::hub_policy(common::lossless_hub_document()));
    let down = converter.convert(&source, ApiVersion::V2).unwrap();
    assert!(!down.stashed);
    assert!(down.policy.metadata().annotations.is_empty());
    let up = converter.convert(&down.policy, ApiVersion::V1).unwrap();
    assert!(!up.restored);
    assert_eq!(up.policy, source);
}

#[test]
fn policy_level_action_without_validate_rule_survives() {
    let converter = Converter::default();
    let mut document = common::lossless_hub_document();
    document["spec"]["validationFailureAction"] = serde_json::json!("Enforce");
    document["spec"]["rules"][0] = serde_json::json!({
        "name": "gen",
        "match": {"any": [{"resources": {"kinds": ["Namespace"]}}]},
        "generate": {"kind": "ConfigMap", "name": "seed"}
    });
    let source = VersionedPolicy::Hub(common::hub_policy(document));
    let down = converter.convert(&source, ApiVersion::V2).unwrap();
    assert!(down.stashed, "the spoke has no rule to carry the action");
    let up = converter.convert(&down.policy, ApiVersion::V1).unwrap();
    assert_eq!(up.policy, source);
}

// ============================================================================
// SECTION: Spoke Safe
// ============================================================================

#[test]
fn per_rule_spoke_round_trips_exactly() {
    let converter = Converter::default();
    let source = VersionedPolicy::Spoke(common::spoke_policy(common::per_rule_spoke_document()));
    let up = converter.convert(&source, ApiVersion::V1).unwrap();
    assert!(up.stashed);
    let down = converter.convert(&up.policy, ApiVersion::V2).unwrap();
    assert!(down.restored);
    assert!(!down.stashed);
    assert_eq!(down.policy, source);
}

#[test]
fn hub_form_aggregates_last_rule_of_each_kind() {
    let converter = Converter::default();
    let source = VersionedPolicy::Spoke(common::spoke_policy(common::per_rule_spoke_document()));
    let hub = common::expect_hub(converter.convert(&source, ApiVersion::V1).unwrap().policy);
    assert_eq!(hub.spec.validation_failure_action, Some(ValidationFailureAction::Audit));
    assert!(!hub.spec.mutate_existing_on_policy_update, "the mutate block sits on a validate rule");
    assert!(hub.spec.generate_existing);
    assert!(hub.spec.validation_failure_action_overrides.is_empty());
    let deny = hub.spec.rules[1].validation.as_ref().unwrap().deny.as_ref().unwrap();
    assert_eq!(
        deny.conditions,
        Some(serde_json::json!({"any": [{"key": "a", "operator": "Equals", "value": "b"}]}))
    );
    assert_eq!(hub.metadata.namespace.as_deref(), Some("team-a"));
}

#[test]
fn rule_order_is_preserved_both_ways() {
    let converter = Converter::default();
    let mut document = common::lossless_hub_document();
    let template = document["spec"]["rules"][0].clone();
    let names = ["zeta", "alpha", "mu", "beta", "omega"];
    document["spec"]["rules"] = serde_json::Value::Array(
        names
            .iter()
            .map(|name| {
                let mut rule = template.clone();
                rule["name"] = serde_json::json!(name);
                rule
            })
            .collect(),
    );
    let source = VersionedPolicy::Hub(common::hub_policy(document));
    let spoke = common::expect_spoke(converter.convert(&source, ApiVersion::V2).unwrap().policy);
    let spoke_names: Vec<&str> = spoke.spec.rules.iter().map(|rule| rule.name.as_str()).collect();
    assert_eq!(spoke_names, names);
    let hub = common::expect_hub(
        converter.convert(&VersionedPolicy::Spoke(spoke), ApiVersion::V1).unwrap().policy,
    );
    let hub_names: Vec<&str> = hub.spec.rules.iter().map(|rule| rule.name.as_str()).collect();
    assert_eq!(hub_names, names);
}
