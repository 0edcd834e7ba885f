// crates/policy-conversion/tests/common/mod.rs
// =============================================================================
// Module: Conversion Test Helpers
// Description: Shared fixtures and recording sinks for conversion tests.
// Purpose: Reduce duplication across integration tests for policy-conversion.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::sync::Mutex;

use policy_api::VersionedPolicy;
use policy_api::hub;
use policy_api::spoke;
use policy_conversion::ConversionAuditEvent;
use policy_conversion::ConversionAuditSink;
use policy_conversion::ValidationAuditEvent;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Decodes a hub document or panics.
pub fn hub_policy(document: Value) -> hub::Policy {
    match VersionedPolicy::from_value(document) {
        Ok(VersionedPolicy::Hub(policy)) => policy,
        other => panic!("expected hub policy, got {other:?}"),
    }
}

/// Decodes a spoke document or panics.
pub fn spoke_policy(document: Value) -> spoke::Policy {
    match VersionedPolicy::from_value(document) {
        Ok(VersionedPolicy::Spoke(policy)) => policy,
        other => panic!("expected spoke policy, got {other:?}"),
    }
}

/// Unwraps a hub object.
pub fn expect_hub(policy: VersionedPolicy) -> hub::Policy {
    match policy {
        VersionedPolicy::Hub(policy) => policy,
        VersionedPolicy::Spoke(_) => panic!("expected hub object"),
    }
}

/// Unwraps a spoke object.
pub fn expect_spoke(policy: VersionedPolicy) -> spoke::Policy {
    match policy {
        VersionedPolicy::Spoke(policy) => policy,
        VersionedPolicy::Hub(_) => panic!("expected spoke object"),
    }
}

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Hub document exercising every legacy field.
pub fn legacy_hub_document() -> Value {
    json!({
        "apiVersion": "kyverno.io/v1",
        "kind": "ClusterPolicy",
        "metadata": {
            "name": "supply-chain",
            "uid": "6d1c2c4e-0000-4000-8000-000000000001",
            "resourceVersion": "42",
            "labels": {"team": "platform"}
        },
        "spec": {
            "validationFailureAction": "Enforce",
            "validationFailureActionOverrides": [
                {"action": "Audit", "namespaces": ["sandbox"]}
            ],
            "background": true,
            "schemaValidation": false,
            "mutateExistingOnPolicyUpdate": true,
            "generateExistingOnPolicyUpdate": true,
            "webhookTimeoutSeconds": 15,
            "rules": [
                {
                    "name": "require-team-label",
                    "match": {
                        "resources": {"kinds": ["Pod"], "name": "web"},
                        "roles": ["dev:editor"]
                    },
                    "preconditions": [
                        {"key": "{{ request.operation }}", "operator": "NotEquals", "value": "DELETE"}
                    ],
                    "validate": {
                        "message": "team label is required",
                        "deny": {
                            "conditions": [
                                {"key": "{{ request.object.metadata.labels.team }}", "operator": "Equals", "value": ""}
                            ]
                        }
                    }
                },
                {
                    "name": "stamp-owner",
                    "match": {"any": [{"resources": {"kinds": ["ConfigMap"]}}]},
                    "mutate": {
                        "targets": [{
                            "apiVersion": "v1",
                            "kind": "ConfigMap",
                            "name": "owners",
                            "preconditions": [{"key": "a", "operator": "Equals", "value": "b"}]
                        }],
                        "patchStrategicMerge": {"metadata": {"labels": {"owner": "platform"}}}
                    }
                },
                {
                    "name": "default-quota",
                    "match": {"any": [{"resources": {"kinds": ["Namespace"]}}]},
                    "generate": {"apiVersion": "v1", "kind": "ResourceQuota", "name": "default", "synchronize": true}
                },
                {
                    "name": "signed-images",
                    "match": {"any": [{"resources": {"kinds": ["Pod"]}}]},
                    "verifyImages": [{
                        "image": "ghcr.io/acme/*",
                        "key": "-----BEGIN PUBLIC KEY-----\nMFkw\n-----END PUBLIC KEY-----",
                        "annotations": {"env": "prod"},
                        "mutateDigest": false,
                        "attestations": [{"predicateType": "https://slsa.dev/provenance/v0.2"}]
                    }]
                }
            ]
        }
    })
}

/// Spoke document using per-rule controls the hub cannot hold.
pub fn per_rule_spoke_document() -> Value {
    json!({
        "apiVersion": "kyverno.io/v2",
        "kind": "Policy",
        "metadata": {"name": "tenant-guard", "namespace": "team-a", "uid": "6d1c2c4e-0000-4000-8000-000000000002"},
        "spec": {
            "background": false,
            "rules": [
                {
                    "name": "no-latest",
                    "match": {"any": [{"resources": {"kinds": ["Pod"]}}]},
                    "validate": {
                        "validationFailureAction": "Enforce",
                        "validationFailureActionOverrides": [
                            {"action": "Audit", "namespaces": ["team-a"]}
                        ],
                        "message": "pin image tags",
                        "pattern": {"spec": {"containers": [{"image": "!*:latest"}]}}
                    }
                },
                {
                    "name": "require-owner",
                    "match": {"all": [{"resources": {"kinds": ["Deployment"], "namespaces": ["team-a"]}}]},
                    "preconditions": {"all": [{"key": "{{ request.operation }}", "operator": "Equals", "value": "CREATE"}]},
                    "validate": {
                        "validationFailureAction": "Audit",
                        "message": "owner label is required",
                        "deny": {"conditions": {"any": [{"key": "a", "operator": "Equals", "value": "b"}]}}
                    },
                    "mutate": {
                        "mutateExistingOnPolicyUpdate": true,
                        "patchStrategicMerge": {"metadata": {"labels": {"reviewed": "true"}}}
                    }
                },
                {
                    "name": "seed-config",
                    "match": {"any": [{"resources": {"kinds": ["Namespace"]}}]},
                    "generate": {"generateExisting": true, "apiVersion": "v1", "kind": "ConfigMap", "name": "seed"}
                }
            ]
        }
    })
}

/// Hub document that maps to the spoke and back without loss.
pub fn lossless_hub_document() -> Value {
    json!({
        "apiVersion": "kyverno.io/v1",
        "kind": "ClusterPolicy",
        "metadata": {"name": "plain"},
        "spec": {
            "validationFailureAction": "Audit",
            "rules": [{
                "name": "check",
                "match": {"any": [{"resources": {"kinds": ["Pod"]}}]},
                "validate": {"message": "m", "pattern": {"metadata": {"name": "?*"}}}
            }]
        }
    })
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink that keeps every event in memory.
#[derive(Default)]
pub struct RecordingSink {
    /// Recorded conversion events.
    pub events: Mutex<Vec<ConversionAuditEvent>>,
    /// Recorded validation events.
    pub validations: Mutex<Vec<ValidationAuditEvent>>,
}

impl RecordingSink {
    /// Returns a snapshot of the recorded conversion events.
    pub fn events(&self) -> Vec<ConversionAuditEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ConversionAuditSink for RecordingSink {
    fn record(&self, event: &ConversionAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn record_validation(&self, event: &ValidationAuditEvent) {
        self.validations.lock().unwrap().push(event.clone());
    }
}
