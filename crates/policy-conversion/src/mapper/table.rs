// crates/policy-conversion/src/mapper/table.rs
// ============================================================================
// Module: Field Mapping Table
// Description: Static enumeration of every hub/spoke field pair.
// Purpose: Make the conversion surface reviewable without reading the code.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The table is built at compile time and never mutated. Each entry names the
//! hub path, the spoke path, and how the pair converts. Fields with no peer
//! carry a static note instead of raising a runtime error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Note attached to fields that exist in one schema only.
pub const MANUAL_CONVERSION_NOTE: &str = "requires manual conversion: does not exist in peer type";

/// How a field pair converts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldClass {
    /// Same shape on both sides; copied structurally.
    Compatible,
    /// Shape differs; a mapping function computes the peer value.
    Computed,
    /// Policy-level on the hub, per rule on the spoke; routed by rule kind.
    Routed,
    /// Exists on the hub only.
    HubOnly,
    /// Exists on the spoke only.
    SpokeOnly,
}

impl FieldClass {
    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compatible => "compatible",
            Self::Computed => "computed",
            Self::Routed => "routed",
            Self::HubOnly => "hub_only",
            Self::SpokeOnly => "spoke_only",
        }
    }
}

/// One row of the field mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldMapping {
    /// Hub field path, absent for spoke-only fields.
    pub hub: Option<&'static str>,
    /// Spoke field path, absent for hub-only fields.
    pub spoke: Option<&'static str>,
    /// Conversion class.
    pub class: FieldClass,
    /// Static handling note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
}

impl FieldMapping {
    /// Field copied structurally.
    const fn compatible(path: &'static str) -> Self {
        Self::pair(path, path, FieldClass::Compatible)
    }

    /// Field whose peer is computed.
    const fn computed(hub: &'static str, spoke: &'static str) -> Self {
        Self::pair(hub, spoke, FieldClass::Computed)
    }

    /// Policy-level hub field routed into spoke rules.
    const fn routed(hub: &'static str, spoke: &'static str) -> Self {
        Self::pair(hub, spoke, FieldClass::Routed)
    }

    /// Field present on the hub only.
    const fn hub_only(hub: &'static str) -> Self {
        Self {
            hub: Some(hub),
            spoke: None,
            class: FieldClass::HubOnly,
            note: Some(MANUAL_CONVERSION_NOTE),
        }
    }

    /// Field present on the spoke only.
    const fn spoke_only(spoke: &'static str) -> Self {
        Self {
            hub: None,
            spoke: Some(spoke),
            class: FieldClass::SpokeOnly,
            note: Some(MANUAL_CONVERSION_NOTE),
        }
    }

    /// Two-sided entry.
    const fn pair(hub: &'static str, spoke: &'static str, class: FieldClass) -> Self {
        Self {
            hub: Some(hub),
            spoke: Some(spoke),
            class,
            note: None,
        }
    }
}

// ============================================================================
// SECTION: Table
// ============================================================================

/// Every field pair between the hub and the spoke, in document order.
pub static FIELD_MAPPINGS: &[FieldMapping] = &[
    FieldMapping::compatible("metadata"),
    FieldMapping::compatible("status"),
    FieldMapping::compatible("spec.applyRules"),
    FieldMapping::compatible("spec.failurePolicy"),
    FieldMapping::compatible("spec.admission"),
    FieldMapping::compatible("spec.background"),
    FieldMapping::compatible("spec.webhookTimeoutSeconds"),
    FieldMapping::compatible("spec.useServerSideApply"),
    FieldMapping::compatible("spec.webhookConfiguration"),
    FieldMapping::routed(
        "spec.validationFailureAction",
        "spec.rules[].validate.validationFailureAction",
    ),
    FieldMapping::routed(
        "spec.mutateExistingOnPolicyUpdate",
        "spec.rules[].mutate.mutateExistingOnPolicyUpdate",
    ),
    FieldMapping::routed("spec.generateExisting", "spec.rules[].generate.generateExisting"),
    FieldMapping::hub_only("spec.validationFailureActionOverrides"),
    FieldMapping::hub_only("spec.generateExistingOnPolicyUpdate"),
    FieldMapping::hub_only("spec.schemaValidation"),
    FieldMapping::compatible("spec.rules[].name"),
    FieldMapping::compatible("spec.rules[].context"),
    FieldMapping::compatible("spec.rules[].match.any"),
    FieldMapping::compatible("spec.rules[].match.all"),
    FieldMapping::computed("spec.rules[].match.roles", "spec.rules[].match.any[]"),
    FieldMapping::computed("spec.rules[].match.clusterRoles", "spec.rules[].match.any[]"),
    FieldMapping::computed("spec.rules[].match.subjects", "spec.rules[].match.any[]"),
    FieldMapping::computed("spec.rules[].match.resources", "spec.rules[].match.any[]"),
    FieldMapping::computed("spec.rules[].exclude", "spec.rules[].exclude"),
    FieldMapping::computed("resources.name", "resources.names"),
    FieldMapping::compatible("resources.kinds"),
    FieldMapping::compatible("resources.names"),
    FieldMapping::compatible("resources.namespaces"),
    FieldMapping::compatible("resources.annotations"),
    FieldMapping::compatible("resources.selector"),
    FieldMapping::compatible("resources.namespaceSelector"),
    FieldMapping::compatible("resources.operations"),
    FieldMapping::computed("spec.rules[].preconditions", "spec.rules[].preconditions"),
    FieldMapping::compatible("spec.rules[].validate.message"),
    FieldMapping::compatible("spec.rules[].validate.manifests"),
    FieldMapping::compatible("spec.rules[].validate.foreach"),
    FieldMapping::compatible("spec.rules[].validate.pattern"),
    FieldMapping::compatible("spec.rules[].validate.anyPattern"),
    FieldMapping::computed(
        "spec.rules[].validate.deny.conditions",
        "spec.rules[].validate.deny.conditions",
    ),
    FieldMapping::compatible("spec.rules[].validate.podSecurity"),
    FieldMapping::compatible("spec.rules[].validate.cel"),
    FieldMapping::spoke_only("spec.rules[].validate.validationFailureActionOverrides"),
    FieldMapping::computed("spec.rules[].mutate.targets", "spec.rules[].mutate.targets"),
    FieldMapping::compatible("spec.rules[].mutate.patchStrategicMerge"),
    FieldMapping::compatible("spec.rules[].mutate.patchesJson6902"),
    FieldMapping::compatible("spec.rules[].mutate.foreach"),
    FieldMapping::compatible("spec.rules[].generate"),
    FieldMapping::compatible("spec.rules[].verifyImages[].type"),
    FieldMapping::computed(
        "spec.rules[].verifyImages[].image",
        "spec.rules[].verifyImages[].imageReferences",
    ),
    FieldMapping::compatible("spec.rules[].verifyImages[].imageReferences"),
    FieldMapping::compatible("spec.rules[].verifyImages[].skipImageReferences"),
    FieldMapping::computed(
        "spec.rules[].verifyImages[].key",
        "spec.rules[].verifyImages[].attestors",
    ),
    FieldMapping::computed(
        "spec.rules[].verifyImages[].roots",
        "spec.rules[].verifyImages[].attestors",
    ),
    FieldMapping::computed(
        "spec.rules[].verifyImages[].subject",
        "spec.rules[].verifyImages[].attestors",
    ),
    FieldMapping::computed(
        "spec.rules[].verifyImages[].issuer",
        "spec.rules[].verifyImages[].attestors",
    ),
    FieldMapping::computed(
        "spec.rules[].verifyImages[].additionalExtensions",
        "spec.rules[].verifyImages[].attestors",
    ),
    FieldMapping::computed(
        "spec.rules[].verifyImages[].annotations",
        "spec.rules[].verifyImages[].attestors",
    ),
    FieldMapping::compatible("spec.rules[].verifyImages[].attestors"),
    FieldMapping::computed(
        "spec.rules[].verifyImages[].attestations[].predicateType",
        "spec.rules[].verifyImages[].attestations[].type",
    ),
    FieldMapping::compatible("spec.rules[].verifyImages[].attestations[].type"),
    FieldMapping::compatible("spec.rules[].verifyImages[].attestations[].attestors"),
    FieldMapping::compatible("spec.rules[].verifyImages[].attestations[].conditions"),
    FieldMapping::compatible("spec.rules[].verifyImages[].repository"),
    FieldMapping::compatible("spec.rules[].verifyImages[].mutateDigest"),
    FieldMapping::compatible("spec.rules[].verifyImages[].verifyDigest"),
    FieldMapping::compatible("spec.rules[].verifyImages[].required"),
    FieldMapping::compatible("spec.rules[].verifyImages[].useCache"),
    FieldMapping::compatible("spec.rules[].verifyImages[].imageRegistryCredentials"),
];

/// Returns the field mapping table.
#[must_use]
pub fn field_mappings() -> &'static [FieldMapping] {
    FIELD_MAPPINGS
}

/// Returns the entries that need manual handling because they have no peer.
pub fn manual_conversion_fields() -> impl Iterator<Item = &'static FieldMapping> {
    FIELD_MAPPINGS.iter().filter(|mapping| mapping.note.is_some())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
