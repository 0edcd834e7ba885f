// crates/policy-conversion/tests/proptest_round_trip.rs
// ============================================================================
// Module: Round-Trip Property-Based Tests
// Description: Round-trip laws over generated hub and spoke policies.
// Purpose: Ensure no representable field is lost through either schema.
// ============================================================================

//! Round-trip property-based tests.
//!
//! ## Purpose
//! These tests generate policies that lean on fields the peer schema cannot
//! hold and check that converting there and back reproduces the source.
//!
//! ## What is covered
//! - hub to spoke to hub equals the source for hub-only fields, legacy match
//!   and image fields, and raw condition lists;
//! - spoke to hub to spoke equals the source for per-rule failure actions,
//!   per-rule overrides, and background triggers;
//! - converting the result again yields identical bytes;
//! - a hub that already carries a stashed spoke payload, then is edited
//!   through the hub schema (rules dropped or reordered, routed and hub-only
//!   fields changed), still comes back from the spoke exactly as edited.
//!
//! ## What is intentionally out of scope
//! - Floating point values inside opaque blocks, which canonical JSON
//!   renders in shortest form.

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
    reason = "Test-only assertions and helpers are permitted."
)]

use policy_api::ApiVersion;
use policy_api::ValidationFailureAction;
use policy_api::VersionedPolicy;
use policy_api::hub;
use policy_conversion::Converter;
use proptest::prelude::*;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Shared Strategies
// ============================================================================

fn action() -> impl Strategy<Value = Option<&'static str>> {
    prop::option::of(prop_oneof![Just("Audit"), Just("Enforce")])
}

fn kinds() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(prop_oneof![Just("Pod"), Just("Deployment"), Just("ConfigMap")], 1 .. 3)
        .prop_map(|kinds| kinds.into_iter().map(str::to_string).collect())
}

fn condition_list() -> impl Strategy<Value = Value> {
    prop::collection::vec(("[a-z]{1,6}", "[a-z]{0,6}"), 1 .. 3).prop_map(|pairs| {
        Value::Array(
            pairs
                .into_iter()
                .map(|(key, value)| json!({"key": key, "operator": "Equals", "value": value}))
                .collect(),
        )
    })
}

fn overrides() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec(
        (prop_oneof![Just("Audit"), Just("Enforce")], "[a-z]{1,8}")
            .prop_map(|(action, namespace)| json!({"action": action, "namespaces": [namespace]})),
        0 .. 3,
    )
}

fn insert_if_some(object: &mut Value, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        object[key] = value;
    }
}

// ============================================================================
// SECTION: Hub Strategies
// ============================================================================

fn hub_match() -> impl Strategy<Value = Value> {
    prop_oneof![
        (kinds(), prop::option::of("[a-z]{1,8}")).prop_map(|(kinds, name)| {
            let mut resources = json!({"kinds": kinds});
            insert_if_some(&mut resources, "name", name.map(Value::String));
            json!({"resources": resources})
        }),
        kinds().prop_map(|kinds| json!({"any": [{"resources": {"kinds": kinds}}]})),
        kinds().prop_map(|kinds| json!({"all": [{"resources": {"kinds": kinds}}]})),
    ]
}

fn hub_preconditions() -> impl Strategy<Value = Option<Value>> {
    prop_oneof![
        Just(None),
        condition_list().prop_map(Some),
        condition_list().prop_map(|list| Some(json!({"all": list}))),
    ]
}

fn hub_action_block() -> impl Strategy<Value = (&'static str, Value)> {
    prop_oneof![
        ("[a-z ]{1,16}", condition_list()).prop_map(|(message, conditions)| {
            ("validate", json!({"message": message, "deny": {"conditions": conditions}}))
        }),
        "[a-z]{1,8}".prop_map(|owner| {
            ("mutate", json!({"patchStrategicMerge": {"metadata": {"labels": {"owner": owner}}}}))
        }),
        "[a-z]{1,8}".prop_map(|name| {
            ("generate", json!({"apiVersion": "v1", "kind": "ConfigMap", "name": name}))
        }),
        "[a-z]{1,8}".prop_map(|repo| {
            ("verifyImages", json!([{"image": format!("ghcr.io/{repo}/*"), "key": "k"}]))
        }),
    ]
}

fn hub_rule() -> impl Strategy<Value = Value> {
    (hub_match(), hub_preconditions(), hub_action_block()).prop_map(
        |(match_block, preconditions, (block_key, block))| {
            let mut rule = json!({"name": "", "match": match_block});
            insert_if_some(&mut rule, "preconditions", preconditions);
            rule[block_key] = block;
            rule
        },
    )
}

fn hub_document() -> impl Strategy<Value = Value> {
    (
        prop::collection::vec(hub_rule(), 1 .. 5),
        action(),
        overrides(),
        prop::option::of(any::<bool>()),
        prop::option::of(any::<bool>()),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(rules, action, overrides, schema, geop, mutate_existing, generate_existing)| {
            let rules: Vec<Value> = rules
                .into_iter()
                .enumerate()
                .map(|(index, mut rule)| {
                    rule["name"] = json!(format!("rule-{index}"));
                    rule
                })
                .collect();
            let mut spec = json!({
                "rules": rules,
                "validationFailureActionOverrides": overrides,
                "mutateExistingOnPolicyUpdate": mutate_existing,
                "generateExisting": generate_existing
            });
            insert_if_some(&mut spec, "validationFailureAction", action.map(Value::from));
            insert_if_some(&mut spec, "schemaValidation", schema.map(Value::Bool));
            insert_if_some(&mut spec, "generateExistingOnPolicyUpdate", geop.map(Value::Bool));
            json!({
                "apiVersion": "kyverno.io/v1",
                "kind": "ClusterPolicy",
                "metadata": {"name": "generated-hub"},
                "spec": spec
            })
        })
}

// ============================================================================
// SECTION: Spoke Strategies
// ============================================================================

fn spoke_action_block() -> impl Strategy<Value = (&'static str, Value)> {
    prop_oneof![
        (action(), overrides(), "[a-z ]{1,16}").prop_map(|(action, overrides, message)| {
            let mut block = json!({
                "message": message,
                "validationFailureActionOverrides": overrides,
                "pattern": {"metadata": {"name": "?*"}}
            });
            insert_if_some(&mut block, "validationFailureAction", action.map(Value::from));
            ("validate", block)
        }),
        any::<bool>().prop_map(|trigger| {
            (
                "mutate",
                json!({
                    "mutateExistingOnPolicyUpdate": trigger,
                    "patchStrategicMerge": {"metadata": {"labels": {"seen": "yes"}}}
                }),
            )
        }),
        (any::<bool>(), "[a-z]{1,8}").prop_map(|(trigger, name)| {
            (
                "generate",
                json!({"generateExisting": trigger, "apiVersion": "v1", "kind": "Secret", "name": name}),
            )
        }),
    ]
}

fn spoke_document() -> impl Strategy<Value = Value> {
    (
        prop::collection::vec((kinds(), spoke_action_block()), 1 .. 5),
        prop::option::of(any::<bool>()),
    )
        .prop_map(|(rules, background)| {
            let rules: Vec<Value> = rules
                .into_iter()
                .enumerate()
                .map(|(index, (kinds, (block_key, block)))| {
                    let mut rule = json!({
                        "name": format!("rule-{index}"),
                        "match": {"any": [{"resources": {"kinds": kinds}}]}
                    });
                    rule[block_key] = block;
                    rule
                })
                .collect();
            let mut spec = json!({"rules": rules});
            insert_if_some(&mut spec, "background", background.map(Value::Bool));
            json!({
                "apiVersion": "kyverno.io/v2",
                "kind": "Policy",
                "metadata": {"name": "generated-spoke", "namespace": "team-a"},
                "spec": spec
            })
        })
}

// ============================================================================
// SECTION: Hub Edits
// ============================================================================

#[derive(Debug, Clone)]
enum HubEdit {
    DropRule(usize),
    ReverseRules,
    SetAction(Option<ValidationFailureAction>),
    SetBackground(Option<bool>),
    SetMutateExisting(bool),
    SetGenerateExisting(bool),
    SetSchemaValidation(Option<bool>),
}

fn hub_edit() -> impl Strategy<Value = HubEdit> {
    let failure_action =
        prop_oneof![Just(ValidationFailureAction::Audit), Just(ValidationFailureAction::Enforce)];
    prop_oneof![
        any::<usize>().prop_map(HubEdit::DropRule),
        Just(HubEdit::ReverseRules),
        prop::option::of(failure_action).prop_map(HubEdit::SetAction),
        prop::option::of(any::<bool>()).prop_map(HubEdit::SetBackground),
        any::<bool>().prop_map(HubEdit::SetMutateExisting),
        any::<bool>().prop_map(HubEdit::SetGenerateExisting),
        prop::option::of(any::<bool>()).prop_map(HubEdit::SetSchemaValidation),
    ]
}

fn apply_edit(policy: &mut hub::Policy, edit: &HubEdit) {
    let spec = &mut policy.spec;
    match edit {
        HubEdit::DropRule(index) => {
            if !spec.rules.is_empty() {
                let at = index % spec.rules.len();
                spec.rules.remove(at);
            }
        }
        HubEdit::ReverseRules => spec.rules.reverse(),
        HubEdit::SetAction(action) => spec.validation_failure_action = *action,
        HubEdit::SetBackground(background) => spec.background = *background,
        HubEdit::SetMutateExisting(value) => spec.mutate_existing_on_policy_update = *value,
        HubEdit::SetGenerateExisting(value) => spec.generate_existing = *value,
        HubEdit::SetSchemaValidation(value) => spec.schema_validation = *value,
    }
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #[test]
    fn hub_survives_a_spoke_round_trip(document in hub_document()) {
        let converter = Converter::default();
        let source = VersionedPolicy::from_value(document).unwrap();
        let down = converter.convert(&source, ApiVersion::V2).unwrap().policy;
        let up = converter.convert(&down, ApiVersion::V1).unwrap().policy;
        prop_assert_eq!(&up, &source);

        let again = converter.convert(&up, ApiVersion::V2).unwrap().policy;
        prop_assert_eq!(again.to_value().unwrap(), down.to_value().unwrap());
    }

    #[test]
    fn spoke_survives_a_hub_round_trip(document in spoke_document()) {
        let converter = Converter::default();
        let source = VersionedPolicy::from_value(document).unwrap();
        let up = converter.convert(&source, ApiVersion::V1).unwrap().policy;
        let down = converter.convert(&up, ApiVersion::V2).unwrap().policy;
        prop_assert_eq!(&down, &source);
    }

    #[test]
    fn edited_annotated_hub_survives_a_spoke_round_trip(
        document in spoke_document(),
        edits in prop::collection::vec(hub_edit(), 1 .. 4)
    ) {
        let converter = Converter::default();
        let source = VersionedPolicy::from_value(document).unwrap();
        let VersionedPolicy::Hub(mut hub) = converter.convert(&source, ApiVersion::V1).unwrap().policy
        else {
            panic!("expected hub object");
        };
        for edit in &edits {
            apply_edit(&mut hub, edit);
        }
        let edited = VersionedPolicy::Hub(hub);
        let down = converter.convert(&edited, ApiVersion::V2).unwrap().policy;
        let up = converter.convert(&down, ApiVersion::V1).unwrap().policy;
        prop_assert_eq!(&up, &edited);
    }
}
