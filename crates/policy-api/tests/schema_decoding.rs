// crates/policy-api/tests/schema_decoding.rs
// ============================================================================
// Module: Schema Decoding Tests
// Description: Tests for versioned policy decoding and rendering.
// Purpose: Ensure documents land in the schema their apiVersion names.
// Dependencies: policy-api, serde_json
// ============================================================================
//! ## Overview
//! Exercises `VersionedPolicy::from_value` / `to_value`, schema defaults, and
//! rule-kind routing helpers.

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
use policy_api::ImageVerificationType;
use policy_api::PolicyKind;
use policy_api::RoutedFields;
use policy_api::RuleKind;
use policy_api::SchemaError;
use policy_api::ValidationFailureAction;
use policy_api::VersionedPolicy;
use serde_json::json;

// ============================================================================
// SECTION: Decoding
// ============================================================================

#[test]
fn hub_document_decodes_with_legacy_fields() {
    let document = json!({
        "apiVersion": "kyverno.io/v1",
        "kind": "ClusterPolicy",
        "metadata": {"name": "check-images", "creationTimestamp": "2024-01-01T00:00:00Z"},
        "spec": {
            "validationFailureAction": "enforce",
            "rules": [{
                "name": "verify",
                "match": {"resources": {"kinds": ["Pod"], "name": "web"}, "roles": ["ns:dev"]},
                "verifyImages": [{"image": "ghcr.io/acme/*", "key": "PEM", "type": "Notary"}]
            }]
        }
    });
    let policy = VersionedPolicy::from_value(document).unwrap();
    let VersionedPolicy::Hub(hub) = policy else {
        panic!("expected hub object");
    };
    assert_eq!(hub.kind, PolicyKind::ClusterPolicy);
    assert_eq!(hub.spec.validation_failure_action, Some(ValidationFailureAction::Enforce));
    let rule = &hub.spec.rules[0];
    assert_eq!(rule.match_resources.resources.name, "web");
    assert_eq!(rule.match_resources.user_info.roles, vec!["ns:dev".to_string()]);
    let image = &rule.verify_images[0];
    assert_eq!(image.verification_type, Some(ImageVerificationType::Notary));
    assert!(image.mutate_digest, "mutateDigest defaults to true");
    assert!(image.legacy_attestor_set().is_some());
    assert_eq!(
        hub.metadata.extra.get("creationTimestamp"),
        Some(&json!("2024-01-01T00:00:00Z"))
    );
}

#[test]
fn spoke_document_decodes_per_rule_controls() {
    let document = json!({
        "apiVersion": "kyverno.io/v2",
        "kind": "Policy",
        "metadata": {"name": "gen", "namespace": "team-a"},
        "spec": {
            "rules": [{
                "name": "clone-secret",
                "match": {"any": [{"resources": {"kinds": ["Namespace"]}}]},
                "generate": {"generateExisting": true, "kind": "Secret", "name": "regcred"}
            }]
        }
    });
    let VersionedPolicy::Spoke(spoke) = VersionedPolicy::from_value(document).unwrap() else {
        panic!("expected spoke object");
    };
    let generation = spoke.spec.rules[0].generation.as_ref().unwrap();
    assert!(generation.generate_existing);
    assert_eq!(generation.resource.kind, "Secret");
    assert!(RoutedFields::from_spoke(&spoke.spec).generate_existing);
}

#[test]
fn unknown_and_missing_versions_fail_closed() {
    let unknown = json!({"apiVersion": "kyverno.io/v9", "kind": "ClusterPolicy"});
    assert_eq!(
        VersionedPolicy::from_value(unknown),
        Err(SchemaError::UnsupportedVersion("kyverno.io/v9".to_string()))
    );
    let foreign = json!({"apiVersion": "policy.example.com/v1", "kind": "ClusterPolicy"});
    assert!(matches!(
        VersionedPolicy::from_value(foreign),
        Err(SchemaError::UnsupportedVersion(_))
    ));
    let missing = json!({"kind": "ClusterPolicy"});
    assert_eq!(VersionedPolicy::from_value(missing), Err(SchemaError::MissingApiVersion));
}

#[test]
fn unknown_kind_is_malformed() {
    let document = json!({"apiVersion": "kyverno.io/v2", "kind": "Deployment"});
    assert!(matches!(
        VersionedPolicy::from_value(document),
        Err(SchemaError::Malformed { version: ApiVersion::V2, .. })
    ));
}

#[test]
fn rendering_restores_api_version() {
    let document = json!({
        "apiVersion": "kyverno.io/v2",
        "kind": "ClusterPolicy",
        "metadata": {"name": "p"},
        "spec": {"background": false}
    });
    let policy = VersionedPolicy::from_value(document.clone()).unwrap();
    assert_eq!(policy.to_value().unwrap(), document);
}

// ============================================================================
// SECTION: Rule Kind
// ============================================================================

#[test]
fn rule_kind_priority() {
    assert_eq!(RuleKind::from_blocks(true, true, true, true), RuleKind::Validate);
    assert_eq!(RuleKind::from_blocks(false, true, true, false), RuleKind::Mutate);
    assert_eq!(RuleKind::from_blocks(false, false, true, true), RuleKind::Generate);
    assert_eq!(RuleKind::from_blocks(false, false, false, true), RuleKind::VerifyImages);
    assert_eq!(RuleKind::from_blocks(false, false, false, false), RuleKind::Empty);
}

#[test]
fn api_version_parsing() {
    assert_eq!(ApiVersion::parse("kyverno.io/v1"), Some(ApiVersion::V1));
    assert_eq!(ApiVersion::parse("kyverno.io/v2"), Some(ApiVersion::V2));
    assert_eq!(ApiVersion::parse("v2"), None);
    assert_eq!(ApiVersion::parse_short("v2"), Some(ApiVersion::V2));
    assert!(ApiVersion::HUB.is_hub());
}
