// crates/policy-api/src/schema/spoke.rs
// ============================================================================
// Module: Spoke Schema
// Description: Served non-storage version (`kyverno.io/v2`) of the policy.
// Purpose: Model the spoke shape with per-rule failure controls.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The spoke moves failure-action and background-trigger settings from the
//! policy down into each rule, types every condition block, and drops the
//! deprecated single-value fields the hub still carries.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::schema::common::AdmissionOperation;
use crate::schema::common::AnyAllConditions;
use crate::schema::common::ApplyRulesType;
use crate::schema::common::AttestorSet;
use crate::schema::common::CloneFrom;
use crate::schema::common::CloneList;
use crate::schema::common::FailurePolicyType;
use crate::schema::common::ImageRegistryCredentials;
use crate::schema::common::ImageVerificationType;
use crate::schema::common::LabelSelector;
use crate::schema::common::ObjectMeta;
use crate::schema::common::ResourceSpec;
use crate::schema::common::UserInfo;
use crate::schema::common::ValidationFailureAction;
use crate::schema::common::ValidationFailureActionOverride;
use crate::schema::common::WebhookConfiguration;
use crate::schema::common::default_true;
use crate::schema::common::is_false;
use crate::schema::versioned::PolicyKind;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Spoke policy object. The `apiVersion` lives on [`crate::VersionedPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Cluster-wide or namespaced resource kind.
    pub kind: PolicyKind,
    /// Object metadata.
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Desired state.
    #[serde(default)]
    pub spec: Spec,
    /// Observed status, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
}

/// Spoke policy specification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spec {
    /// Ordered rules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,
    /// One or all matching rules apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_rules: Option<ApplyRulesType>,
    /// Webhook failure policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_policy: Option<FailurePolicyType>,
    /// Admission processing toggle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admission: Option<bool>,
    /// Background processing toggle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<bool>,
    /// Webhook timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_timeout_seconds: Option<i32>,
    /// Use server-side apply for generate rules.
    #[serde(default, skip_serializing_if = "is_false")]
    pub use_server_side_apply: bool,
    /// Webhook registration overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_configuration: Option<WebhookConfiguration>,
}

// ============================================================================
// SECTION: Rule
// ============================================================================

/// Spoke rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Rule name, unique within the policy.
    #[serde(default)]
    pub name: String,
    /// Resources the rule selects.
    #[serde(default, rename = "match")]
    pub match_resources: MatchResources,
    /// Resources the rule skips.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<MatchResources>,
    /// Context entries, kept opaque.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<Value>,
    /// Typed preconditions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<AnyAllConditions>,
    /// Validation block.
    #[serde(default, rename = "validate", skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
    /// Mutation block.
    #[serde(default, rename = "mutate", skip_serializing_if = "Option::is_none")]
    pub mutation: Option<Mutation>,
    /// Generation block.
    #[serde(default, rename = "generate", skip_serializing_if = "Option::is_none")]
    pub generation: Option<Generation>,
    /// Image verification entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verify_images: Vec<ImageVerification>,
}

// ============================================================================
// SECTION: Matching
// ============================================================================

/// Spoke match or exclude block: `any` or `all`, never both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResources {
    /// Filters combined with OR.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any: Vec<ResourceFilter>,
    /// Filters combined with AND.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all: Vec<ResourceFilter>,
}

impl MatchResources {
    /// Returns true when nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.any.is_empty() && self.all.is_empty()
    }

    /// Returns every kind selector across `any` and `all`, in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        self.any
            .iter()
            .chain(&self.all)
            .flat_map(|filter| filter.resources.kinds.iter().map(String::as_str))
            .collect()
    }
}

/// Spoke resource filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceFilter {
    /// User info constraints.
    #[serde(flatten)]
    pub user_info: UserInfo,
    /// Resource constraints.
    #[serde(default, skip_serializing_if = "ResourceDescription::is_empty")]
    pub resources: ResourceDescription,
}

/// Spoke resource description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescription {
    /// Kind selectors (`Kind`, `version/Kind`, `group/version/Kind`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<String>,
    /// Resource names, wildcards allowed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    /// Namespace names, wildcards allowed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<String>,
    /// Annotation matches.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Label selector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,
    /// Namespace label selector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_selector: Option<LabelSelector>,
    /// Admission operations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operations: Vec<AdmissionOperation>,
}

impl ResourceDescription {
    /// Returns true when no constraint is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// ============================================================================
// SECTION: Rule Blocks
// ============================================================================

/// Spoke validation block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
    /// Failure action for this rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_failure_action: Option<ValidationFailureAction>,
    /// Namespace overrides of the failure action for this rule.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_failure_action_overrides: Vec<ValidationFailureActionOverride>,
    /// Message reported on failure.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    /// Manifest signature verification, kept opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifests: Option<Value>,
    /// Foreach validations, kept opaque.
    #[serde(default, rename = "foreach", skip_serializing_if = "Vec::is_empty")]
    pub for_each: Vec<Value>,
    /// Overlay pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Value>,
    /// Alternative overlay patterns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub any_pattern: Option<Value>,
    /// Deny block with typed conditions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deny: Option<Deny>,
    /// Pod security settings, kept opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_security: Option<Value>,
    /// CEL validations, kept opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cel: Option<Value>,
}

/// Spoke deny block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deny {
    /// Typed conditions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<AnyAllConditions>,
}

/// Spoke mutation target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetResourceSpec {
    /// Target reference.
    #[serde(flatten)]
    pub resource: ResourceSpec,
    /// Context entries, kept opaque.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<Value>,
    /// Typed preconditions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<AnyAllConditions>,
}

/// Spoke mutation block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mutation {
    /// Mutate existing resources when the policy changes.
    #[serde(default, skip_serializing_if = "is_false")]
    pub mutate_existing_on_policy_update: bool,
    /// Existing resources to mutate.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<TargetResourceSpec>,
    /// Strategic merge patch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_strategic_merge: Option<Value>,
    /// RFC 6902 patch document.
    #[serde(default, rename = "patchesJson6902", skip_serializing_if = "String::is_empty")]
    pub patches_json6902: String,
    /// Foreach mutations, kept opaque.
    #[serde(default, rename = "foreach", skip_serializing_if = "Vec::is_empty")]
    pub for_each: Vec<Value>,
}

/// Spoke generation block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Generation {
    /// Generate for existing triggers when the policy is created.
    #[serde(default, skip_serializing_if = "is_false")]
    pub generate_existing: bool,
    /// Generated resource reference.
    #[serde(flatten)]
    pub resource: ResourceSpec,
    /// Keep the generated resource in sync.
    #[serde(default, skip_serializing_if = "is_false")]
    pub synchronize: bool,
    /// Keep generated resources when the policy is deleted.
    #[serde(default, skip_serializing_if = "is_false")]
    pub orphan_downstream_on_policy_delete: bool,
    /// Inline resource data, kept opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Clone source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone: Option<CloneFrom>,
    /// Multi-resource clone source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone_list: Option<CloneList>,
}

// ============================================================================
// SECTION: Image Verification
// ============================================================================

/// Spoke attestation check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    /// Attestation type.
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub attestation_type: String,
    /// Attestors for the attestation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attestors: Vec<AttestorSet>,
    /// Conditions over the attestation payload.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<AnyAllConditions>,
}

/// Spoke image verification entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageVerification {
    /// Signature format; unset means cosign.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub verification_type: Option<ImageVerificationType>,
    /// Image reference patterns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_references: Vec<String>,
    /// Image references to skip.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skip_image_references: Vec<String>,
    /// Attestor sets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attestors: Vec<AttestorSet>,
    /// Attestation checks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attestations: Vec<Attestation>,
    /// Alternate signature repository.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repository: String,
    /// Rewrite tags to digests.
    #[serde(default = "default_true")]
    pub mutate_digest: bool,
    /// Require digests.
    #[serde(default = "default_true")]
    pub verify_digest: bool,
    /// Fail when no signature is found.
    #[serde(default = "default_true")]
    pub required: bool,
    /// Registry access settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_registry_credentials: Option<ImageRegistryCredentials>,
    /// Cache verification results.
    #[serde(default = "default_true")]
    pub use_cache: bool,
}

impl Default for ImageVerification {
    fn default() -> Self {
        Self {
            verification_type: None,
            image_references: Vec::new(),
            skip_image_references: Vec::new(),
            attestors: Vec::new(),
            attestations: Vec::new(),
            repository: String::new(),
            mutate_digest: true,
            verify_digest: true,
            required: true,
            image_registry_credentials: None,
            use_cache: true,
        }
    }
}
