// crates/policy-api/src/schema/common.rs
// ============================================================================
// Module: Shared Policy Types
// Description: Types whose representation is identical in hub and spoke.
// Purpose: Let the field mapper copy compatible fields without translation.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Types in this module appear unchanged in both schema versions. The mapper
//! copies them structurally; anything with a version-specific shape lives in
//! the `hub` or `spoke` module instead.
//!
//! Collections default to empty and are omitted from the wire form when
//! empty, so an absent list and an empty list are the same value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Webhook timeout applied when a policy leaves the field unset.
pub const DEFAULT_WEBHOOK_TIMEOUT_SECONDS: i32 = 10;
/// Lowest accepted webhook timeout in seconds.
pub const MIN_WEBHOOK_TIMEOUT_SECONDS: i32 = 1;
/// Highest accepted webhook timeout in seconds.
pub const MAX_WEBHOOK_TIMEOUT_SECONDS: i32 = 30;

// ============================================================================
// SECTION: Serde Helpers
// ============================================================================

/// Returns true for the serde default of flags that default to enabled.
pub(crate) const fn default_true() -> bool {
    true
}

/// Skips serializing a flag left at its false default.
#[allow(clippy::trivially_copy_pass_by_ref, reason = "serde skip predicates take references.")]
pub(crate) const fn is_false(value: &bool) -> bool {
    !*value
}

// ============================================================================
// SECTION: Object Metadata
// ============================================================================

/// Standard object metadata; copied verbatim across versions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Object name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Namespace for namespaced objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Unique object identifier assigned by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Opaque optimistic-concurrency token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    /// Generation of the desired state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<i64>,
    /// Object labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Object annotations, including the reserved conversion key.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Remaining metadata keys, passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

// ============================================================================
// SECTION: Selectors and Subjects
// ============================================================================

/// Label selector requirement (`key operator values`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSelectorRequirement {
    /// Label key the requirement applies to.
    #[serde(default)]
    pub key: String,
    /// One of `In`, `NotIn`, `Exists`, `DoesNotExist`.
    #[serde(default)]
    pub operator: String,
    /// Values compared by `In` and `NotIn`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

/// Label selector over labels or namespace labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    /// Exact label matches.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub match_labels: BTreeMap<String, String>,
    /// Set-based requirements.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_expressions: Vec<LabelSelectorRequirement>,
}

/// RBAC subject reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    /// Subject kind: `User`, `Group` or `ServiceAccount`.
    #[serde(default)]
    pub kind: String,
    /// API group of the subject.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_group: String,
    /// Subject name.
    #[serde(default)]
    pub name: String,
    /// Namespace of a `ServiceAccount` subject.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

/// Requesting-user filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    /// Namespaced role names (`namespace:role`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    /// Cluster role names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cluster_roles: Vec<String>,
    /// Users, groups or service accounts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<Subject>,
}

impl UserInfo {
    /// Returns true when no user information is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.cluster_roles.is_empty() && self.subjects.is_empty()
    }
}

/// Admission operation a filter can match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdmissionOperation {
    /// Object creation.
    Create,
    /// Object update.
    Update,
    /// Object deletion.
    Delete,
    /// Connect to a subresource.
    Connect,
}

// ============================================================================
// SECTION: Policy Controls
// ============================================================================

/// Whether one or all matching rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyRulesType {
    /// Stop after the first matching rule.
    One,
    /// Apply every matching rule.
    All,
}

/// Behavior when the webhook call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicyType {
    /// Admit the request.
    Ignore,
    /// Reject the request.
    Fail,
}

/// Outcome of a failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationFailureAction {
    /// Record a report entry and admit the request.
    #[serde(alias = "audit")]
    Audit,
    /// Reject the request.
    #[serde(alias = "enforce")]
    Enforce,
}

impl ValidationFailureAction {
    /// Returns true for the audit action.
    #[must_use]
    pub const fn is_audit(self) -> bool {
        matches!(self, Self::Audit)
    }
}

/// Returns true when an optional failure action resolves to audit.
///
/// An unset action defaults to audit.
#[must_use]
pub const fn resolves_to_audit(action: Option<ValidationFailureAction>) -> bool {
    match action {
        Some(action) => action.is_audit(),
        None => true,
    }
}

/// Namespace-scoped override of the validation failure action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFailureActionOverride {
    /// Action applied within the selected namespaces.
    pub action: ValidationFailureAction,
    /// Namespace names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<String>,
    /// Namespace label selector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_selector: Option<LabelSelector>,
}

/// CEL condition gating the webhook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCondition {
    /// Condition name.
    pub name: String,
    /// CEL expression.
    pub expression: String,
}

/// Webhook registration overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfiguration {
    /// Failure policy for the generated webhook.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_policy: Option<FailurePolicyType>,
    /// Timeout for the generated webhook.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i32>,
    /// CEL match conditions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_conditions: Vec<MatchCondition>,
}

// ============================================================================
// SECTION: Conditions
// ============================================================================

/// Single precondition or deny condition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Left-hand expression.
    #[serde(default)]
    pub key: Value,
    /// Comparison operator.
    #[serde(default)]
    pub operator: String,
    /// Right-hand expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Message reported when the condition fails.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// Typed any/all condition block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnyAllConditions {
    /// Conditions combined with OR.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any: Vec<Condition>,
    /// Conditions combined with AND.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all: Vec<Condition>,
}

// ============================================================================
// SECTION: Resource References
// ============================================================================

/// Reference to a concrete resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    /// API version of the referenced resource.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    /// Kind of the referenced resource.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    /// Namespace of the referenced resource.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    /// Name of the referenced resource.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// UID of the referenced resource.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
}

/// Source of a cloned resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneFrom {
    /// Source namespace.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    /// Source name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

/// Sources of multiple cloned resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneList {
    /// Source namespace.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    /// Kinds to clone.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<String>,
    /// Label selector over source resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,
}

// ============================================================================
// SECTION: Image Verification
// ============================================================================

/// Signature format checked by an image verification rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageVerificationType {
    /// Sigstore cosign signatures.
    #[default]
    Cosign,
    /// Notary v2 signatures.
    Notary,
}

/// Reference to a secret holding key material.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretReference {
    /// Secret name.
    pub name: String,
    /// Secret namespace.
    pub namespace: String,
}

/// Transparency log settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rekor {
    /// Transparency log URL.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
}

/// Multi-key (static key) attestor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticKeyAttestor {
    /// PEM-encoded public keys.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub public_keys: String,
    /// Signature algorithm.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub signature_algorithm: String,
    /// KMS key reference.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kms: String,
    /// Secret holding the public key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretReference>,
    /// Transparency log settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rekor: Option<Rekor>,
}

/// Certificate-based attestor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateAttestor {
    /// PEM-encoded certificate.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cert: String,
    /// PEM-encoded certificate chain.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cert_chain: String,
    /// Transparency log settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rekor: Option<Rekor>,
}

/// Keyless (identity-based) attestor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeylessAttestor {
    /// Certificate issuer.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub issuer: String,
    /// Certificate subject.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subject: String,
    /// PEM-encoded root certificates.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub roots: String,
    /// Certificate extensions to match.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_extensions: BTreeMap<String, String>,
    /// Transparency log settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rekor: Option<Rekor>,
}

impl KeylessAttestor {
    /// Returns true when no keyless field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// One attestor entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestor {
    /// Static key attestor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<StaticKeyAttestor>,
    /// Certificate attestor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificates: Option<CertificateAttestor>,
    /// Keyless attestor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyless: Option<KeylessAttestor>,
    /// Nested attestor set, kept opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestor: Option<Value>,
    /// Signature annotations to match.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Alternate signature repository.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repository: String,
}

impl Attestor {
    /// Returns true when the entry names at least one attestor descriptor.
    #[must_use]
    pub const fn has_descriptor(&self) -> bool {
        self.keys.is_some()
            || self.certificates.is_some()
            || self.keyless.is_some()
            || self.attestor.is_some()
    }
}

/// Group of attestors with a required count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestorSet {
    /// Minimum number of entries that must verify; unset means all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i32>,
    /// Attestor entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<Attestor>,
}

/// Registry access settings for image verification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRegistryCredentials {
    /// Allow plain-HTTP registries.
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_insecure_registry: bool,
    /// Pull secrets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<String>,
}
