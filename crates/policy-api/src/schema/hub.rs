// crates/policy-api/src/schema/hub.rs
// ============================================================================
// Module: Hub Schema
// Description: Storage version (`kyverno.io/v1`) of the policy resource.
// Purpose: Model the hub shape, including deprecated legacy fields.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The hub is the storage version. It keeps fields the spoke dropped: the
//! policy-level failure action and background flags, inline user info on
//! match blocks, the single legacy resource `name`, single-key image
//! verification fields, and raw (untyped) condition blocks.

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
use crate::schema::common::Attestor;
use crate::schema::common::CloneFrom;
use crate::schema::common::CloneList;
use crate::schema::common::FailurePolicyType;
use crate::schema::common::ImageRegistryCredentials;
use crate::schema::common::ImageVerificationType;
use crate::schema::common::KeylessAttestor;
use crate::schema::common::LabelSelector;
use crate::schema::common::ObjectMeta;
use crate::schema::common::ResourceSpec;
use crate::schema::common::StaticKeyAttestor;
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

/// Hub policy object. The `apiVersion` lives on [`crate::VersionedPolicy`].
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

/// Hub policy specification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spec {
    /// Ordered rules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Rule>,
    /// Policy-wide validation failure action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_failure_action: Option<ValidationFailureAction>,
    /// Policy-wide namespace overrides of the failure action.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_failure_action_overrides: Vec<ValidationFailureActionOverride>,
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
    /// Deprecated schema validation toggle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_validation: Option<bool>,
    /// Webhook timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_timeout_seconds: Option<i32>,
    /// Policy-wide mutate-existing trigger.
    #[serde(default, skip_serializing_if = "is_false")]
    pub mutate_existing_on_policy_update: bool,
    /// Policy-wide generate-existing trigger.
    #[serde(default, skip_serializing_if = "is_false")]
    pub generate_existing: bool,
    /// Deprecated predecessor of `generateExisting`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_existing_on_policy_update: Option<bool>,
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

/// Hub rule.
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
    /// Raw preconditions: an any/all object or a bare condition list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<Value>,
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

/// Hub match or exclude block.
///
/// Besides `any`/`all`, the hub still accepts a single inline filter made of
/// user info plus a `resources` description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResources {
    /// Filters combined with OR.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any: Vec<ResourceFilter>,
    /// Filters combined with AND.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all: Vec<ResourceFilter>,
    /// Legacy inline user info.
    #[serde(flatten)]
    pub user_info: UserInfo,
    /// Legacy inline resource description.
    #[serde(default, skip_serializing_if = "ResourceDescription::is_empty")]
    pub resources: ResourceDescription,
}

impl MatchResources {
    /// Returns true when the legacy inline filter carries anything.
    #[must_use]
    pub fn has_inline_filter(&self) -> bool {
        !self.user_info.is_empty() || !self.resources.is_empty()
    }

    /// Returns true when nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.any.is_empty() && self.all.is_empty() && !self.has_inline_filter()
    }
}

/// Hub resource filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceFilter {
    /// User info constraints.
    #[serde(flatten)]
    pub user_info: UserInfo,
    /// Resource constraints.
    #[serde(default, skip_serializing_if = "ResourceDescription::is_empty")]
    pub resources: ResourceDescription,
}

/// Hub resource description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescription {
    /// Kind selectors (`Kind`, `version/Kind`, `group/version/Kind`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<String>,
    /// Deprecated single resource name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
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

/// Hub validation block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validation {
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
    /// Deny block with raw conditions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deny: Option<Deny>,
    /// Pod security settings, kept opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_security: Option<Value>,
    /// CEL validations, kept opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cel: Option<Value>,
}

/// Hub deny block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deny {
    /// Raw conditions: an any/all object or a bare condition list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Value>,
}

/// Hub mutation target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetResourceSpec {
    /// Target reference.
    #[serde(flatten)]
    pub resource: ResourceSpec,
    /// Context entries, kept opaque.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<Value>,
    /// Raw preconditions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preconditions: Option<Value>,
}

/// Hub mutation block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mutation {
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

/// Hub generation block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Generation {
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

/// Hub attestation check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attestation {
    /// Deprecated predicate type; preferred over `type` when set.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub predicate_type: String,
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

/// Hub image verification entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageVerification {
    /// Signature format; unset means cosign.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub verification_type: Option<ImageVerificationType>,
    /// Deprecated single image reference.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
    /// Image reference patterns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_references: Vec<String>,
    /// Image references to skip.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skip_image_references: Vec<String>,
    /// Deprecated single public key.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,
    /// Deprecated keyless roots.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub roots: String,
    /// Deprecated keyless subject.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subject: String,
    /// Deprecated keyless issuer.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub issuer: String,
    /// Deprecated keyless certificate extensions.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_extensions: BTreeMap<String, String>,
    /// Attestor sets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attestors: Vec<AttestorSet>,
    /// Attestation checks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attestations: Vec<Attestation>,
    /// Deprecated signature annotations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
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
            image: String::new(),
            image_references: Vec::new(),
            skip_image_references: Vec::new(),
            key: String::new(),
            roots: String::new(),
            subject: String::new(),
            issuer: String::new(),
            additional_extensions: BTreeMap::new(),
            attestors: Vec::new(),
            attestations: Vec::new(),
            annotations: BTreeMap::new(),
            repository: String::new(),
            mutate_digest: true,
            verify_digest: true,
            required: true,
            image_registry_credentials: None,
            use_cache: true,
        }
    }
}

impl ImageVerification {
    /// Returns the legacy single-key fields folded into one attestor set.
    ///
    /// Returns `None` when neither a key nor any keyless field is set.
    #[must_use]
    pub fn legacy_attestor_set(&self) -> Option<AttestorSet> {
        let keys = (!self.key.is_empty()).then(|| StaticKeyAttestor {
            public_keys: self.key.clone(),
            ..StaticKeyAttestor::default()
        });
        let keyless = KeylessAttestor {
            issuer: self.issuer.clone(),
            subject: self.subject.clone(),
            roots: self.roots.clone(),
            additional_extensions: self.additional_extensions.clone(),
            rekor: None,
        };
        let keyless = (!keyless.is_empty()).then_some(keyless);
        if keys.is_none() && keyless.is_none() {
            return None;
        }
        Some(AttestorSet {
            count: None,
            entries: vec![Attestor {
                keys,
                keyless,
                annotations: self.annotations.clone(),
                ..Attestor::default()
            }],
        })
    }

    /// Returns the image reference patterns including the legacy `image`.
    pub fn all_image_references(&self) -> impl Iterator<Item = &str> {
        self.image_references
            .iter()
            .map(String::as_str)
            .chain((!self.image.is_empty()).then_some(self.image.as_str()))
    }
}
