// crates/policy-api/src/validation/structural.rs
// ============================================================================
// Module: Structural Validator
// Description: Policy-wide structural checks for both schema versions.
// Purpose: Reject malformed policies with a complete list of findings.
// Dependencies: crate::schema, crate::validation
// ============================================================================

//! ## Overview
//! Structural validation inspects a whole policy and returns every finding it
//! can see, each tagged with the field path that caused it. Both schema
//! versions are first lowered to a borrowed view so each rule is written once.
//!
//! Checks performed:
//! - webhook timeout within 1..=30 seconds when set
//! - rule names present, short enough, and unique (later duplicates flagged)
//! - match/exclude blocks well formed for the policy's scope and mode
//! - image verification: a reference pattern, notary attestor restrictions,
//!   attestor set shape, and `mutateDigest` disabled under audit

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use crate::schema::common::AttestorSet;
use crate::schema::common::ImageVerificationType;
use crate::schema::common::MAX_WEBHOOK_TIMEOUT_SECONDS;
use crate::schema::common::MIN_WEBHOOK_TIMEOUT_SECONDS;
use crate::schema::common::ObjectMeta;
use crate::schema::common::resolves_to_audit;
use crate::schema::hub;
use crate::schema::routing::RoutedFields;
use crate::schema::routing::RuleKind;
use crate::schema::spoke;
use crate::schema::versioned::PolicyKind;
use crate::schema::versioned::VersionedPolicy;
use crate::validation::field::FieldError;
use crate::validation::field::FieldErrorList;
use crate::validation::field::FieldPath;
use crate::validation::matching::MatchMode;
use crate::validation::matching::MatchScope;
use crate::validation::matching::MatchView;
use crate::validation::matching::validate_match;
use crate::validation::scope::ResourceScope;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Longest accepted rule name.
pub const MAX_RULE_NAME_LENGTH: usize = 63;
/// Message for an out-of-range webhook timeout.
pub const TIMEOUT_RANGE_MESSAGE: &str = "the timeout value must be between 1 and 30 seconds";
/// Message for digest mutation under audit.
pub const MUTATE_DIGEST_AUDIT_MESSAGE: &str =
    "mutateDigest must be set to false for 'Audit' failure action";
/// Message for an image verification entry without references.
pub const IMAGE_REFERENCE_REQUIRED_MESSAGE: &str = "An image reference is required";

// ============================================================================
// SECTION: Views
// ============================================================================

/// Borrowed image verification entry.
struct ImageView<'a> {
    /// Signature format.
    verification_type: ImageVerificationType,
    /// Reference patterns, including the hub's legacy `image`.
    references: Vec<&'a str>,
    /// Digest mutation flag.
    mutate_digest: bool,
    /// Entry-level attestor sets.
    attestors: &'a [AttestorSet],
    /// Attestor sets of each attestation.
    attestations: Vec<&'a [AttestorSet]>,
    /// Attestor synthesized from the hub's legacy key fields.
    legacy_attestor: Option<AttestorSet>,
}

impl<'a> ImageView<'a> {
    /// Views a hub image verification entry.
    fn from_hub(entry: &'a hub::ImageVerification) -> Self {
        Self {
            verification_type: entry.verification_type.unwrap_or_default(),
            references: entry.all_image_references().collect(),
            mutate_digest: entry.mutate_digest,
            attestors: &entry.attestors,
            attestations: entry.attestations.iter().map(|a| a.attestors.as_slice()).collect(),
            legacy_attestor: entry.legacy_attestor_set(),
        }
    }

    /// Views a spoke image verification entry.
    fn from_spoke(entry: &'a spoke::ImageVerification) -> Self {
        Self {
            verification_type: entry.verification_type.unwrap_or_default(),
            references: entry.image_references.iter().map(String::as_str).collect(),
            mutate_digest: entry.mutate_digest,
            attestors: &entry.attestors,
            attestations: entry.attestations.iter().map(|a| a.attestors.as_slice()).collect(),
            legacy_attestor: None,
        }
    }
}

/// Borrowed rule.
struct RuleView<'a> {
    /// Rule name.
    name: &'a str,
    /// Primary kind.
    kind: RuleKind,
    /// Match block.
    matching: MatchView<'a>,
    /// Exclude block.
    exclude: Option<MatchView<'a>>,
    /// Image verification entries.
    images: Vec<ImageView<'a>>,
    /// Whether the rule's failure action resolves to audit.
    audit: bool,
}

/// Borrowed policy.
struct PolicyView<'a> {
    /// Object metadata.
    metadata: &'a ObjectMeta,
    /// Resource kind.
    kind: PolicyKind,
    /// Admission toggle.
    admission: Option<bool>,
    /// Background toggle.
    background: Option<bool>,
    /// Webhook timeout.
    webhook_timeout_seconds: Option<i32>,
    /// Rules in order.
    rules: Vec<RuleView<'a>>,
}

impl<'a> PolicyView<'a> {
    /// Views a hub policy.
    fn from_hub(policy: &'a hub::Policy) -> Self {
        let spec = &policy.spec;
        let audit = resolves_to_audit(spec.validation_failure_action);
        let rules = spec
            .rules
            .iter()
            .map(|rule| RuleView {
                name: &rule.name,
                kind: RuleKind::of_hub(rule),
                matching: MatchView::from(&rule.match_resources),
                exclude: rule.exclude.as_ref().map(MatchView::from),
                images: rule.verify_images.iter().map(ImageView::from_hub).collect(),
                audit,
            })
            .collect();
        Self {
            metadata: &policy.metadata,
            kind: policy.kind,
            admission: spec.admission,
            background: spec.background,
            webhook_timeout_seconds: spec.webhook_timeout_seconds,
            rules,
        }
    }

    /// Views a spoke policy.
    fn from_spoke(policy: &'a spoke::Policy) -> Self {
        let spec = &policy.spec;
        let rules = spec
            .rules
            .iter()
            .map(|rule| RuleView {
                name: &rule.name,
                kind: RuleKind::of_spoke(rule),
                matching: MatchView::from(&rule.match_resources),
                exclude: rule.exclude.as_ref().map(MatchView::from),
                images: rule.verify_images.iter().map(ImageView::from_spoke).collect(),
                audit: resolves_to_audit(RoutedFields::effective_failure_action(spec, rule)),
            })
            .collect();
        Self {
            metadata: &policy.metadata,
            kind: policy.kind,
            admission: spec.admission,
            background: spec.background,
            webhook_timeout_seconds: spec.webhook_timeout_seconds,
            rules,
        }
    }
}

// ============================================================================
// SECTION: Entry Points
// ============================================================================

/// Validates a policy of either schema version.
#[must_use]
pub fn validate_policy(policy: &VersionedPolicy, scope: &dyn ResourceScope) -> FieldErrorList {
    match policy {
        VersionedPolicy::Hub(policy) => validate_hub(policy, scope),
        VersionedPolicy::Spoke(policy) => validate_spoke(policy, scope),
    }
}

/// Validates a hub policy.
#[must_use]
pub fn validate_hub(policy: &hub::Policy, scope: &dyn ResourceScope) -> FieldErrorList {
    validate_view(&PolicyView::from_hub(policy), scope)
}

/// Validates a spoke policy.
#[must_use]
pub fn validate_spoke(policy: &spoke::Policy, scope: &dyn ResourceScope) -> FieldErrorList {
    validate_view(&PolicyView::from_spoke(policy), scope)
}

/// Checks the webhook timeout range; an unset timeout is valid.
#[must_use]
pub fn validate_webhook_timeout(timeout: Option<i32>, path: &FieldPath) -> Option<FieldError> {
    let timeout = timeout?;
    let in_range = (MIN_WEBHOOK_TIMEOUT_SECONDS ..= MAX_WEBHOOK_TIMEOUT_SECONDS).contains(&timeout);
    (!in_range).then(|| FieldError::invalid(path.clone(), TIMEOUT_RANGE_MESSAGE))
}

/// Checks rule names; `rules_path` points at the rule list.
///
/// Every occurrence after the first of a repeated name is flagged at its own
/// index.
#[must_use]
pub fn validate_rule_names<'a, I>(names: I, rules_path: &FieldPath) -> FieldErrorList
where
    I: IntoIterator<Item = &'a str>,
{
    let mut errors = FieldErrorList::new();
    let mut seen = BTreeSet::new();
    for (index, name) in names.into_iter().enumerate() {
        let name_path = rules_path.index(index).child("name");
        if name.trim().is_empty() {
            errors.push(FieldError::required(name_path, "rule name is required"));
            continue;
        }
        if name.len() > MAX_RULE_NAME_LENGTH {
            errors.push(FieldError::invalid(
                name_path.clone(),
                format!("rule name must be at most {MAX_RULE_NAME_LENGTH} characters"),
            ));
        }
        if !seen.insert(name) {
            errors.push(FieldError::duplicate(name_path, format!("Duplicate rule name: '{name}'")));
        }
    }
    errors
}

// ============================================================================
// SECTION: Policy Checks
// ============================================================================

/// Runs every check over a lowered policy.
fn validate_view(policy: &PolicyView<'_>, scope: &dyn ResourceScope) -> FieldErrorList {
    let mut errors = FieldErrorList::new();
    let metadata_path = FieldPath::new("metadata");
    if policy.metadata.name.trim().is_empty() {
        errors.push(FieldError::required(metadata_path.child("name"), "name is required"));
    }
    let namespace = policy.metadata.namespace.as_deref().filter(|ns| !ns.is_empty());
    let namespaced = policy.kind.is_namespaced();
    if namespaced && namespace.is_none() {
        errors.push(FieldError::required(
            metadata_path.child("namespace"),
            "namespace is required for a namespaced policy",
        ));
    }

    let spec_path = FieldPath::new("spec");
    if policy.admission == Some(false) && policy.background == Some(false) {
        errors.push(FieldError::invalid(
            spec_path.child("admission"),
            "admission and background processing cannot both be disabled",
        ));
    }
    errors.extend(validate_webhook_timeout(
        policy.webhook_timeout_seconds,
        &spec_path.child("webhookTimeoutSeconds"),
    ));

    let rules_path = spec_path.child("rules");
    if policy.rules.is_empty() {
        errors.push(FieldError::required(rules_path.clone(), "a policy must contain at least one rule"));
    }
    errors.extend(validate_rule_names(policy.rules.iter().map(|rule| rule.name), &rules_path));

    let match_scope = MatchScope {
        namespaced,
        namespace,
        resources: scope,
    };
    let mode = MatchMode::for_background(policy.background);
    for (index, rule) in policy.rules.iter().enumerate() {
        validate_rule(rule, &rules_path.index(index), mode, &match_scope, &mut errors);
    }
    errors
}

/// Checks one rule.
fn validate_rule(
    rule: &RuleView<'_>,
    path: &FieldPath,
    mode: MatchMode,
    scope: &MatchScope<'_>,
    errors: &mut FieldErrorList,
) {
    if rule.kind == RuleKind::Empty {
        errors.push(FieldError::required(
            path.clone(),
            "a rule must define one of validate, mutate, generate or verifyImages",
        ));
    }
    let match_path = path.child("match");
    if rule.matching.is_empty() {
        errors.push(FieldError::required(
            match_path.clone(),
            "match must select at least one resource filter",
        ));
    }
    errors.extend(validate_match(&rule.matching, &match_path, mode, scope));
    if let Some(exclude) = &rule.exclude {
        errors.extend(validate_match(exclude, &path.child("exclude"), mode, scope));
    }
    for (index, image) in rule.images.iter().enumerate() {
        validate_image(image, &path.child("verifyImages").index(index), rule.audit, errors);
    }
}

// ============================================================================
// SECTION: Image Checks
// ============================================================================

/// Checks one image verification entry.
fn validate_image(image: &ImageView<'_>, path: &FieldPath, audit: bool, errors: &mut FieldErrorList) {
    if audit && image.mutate_digest {
        errors.push(FieldError::invalid(path.child("mutateDigest"), MUTATE_DIGEST_AUDIT_MESSAGE));
    }
    if !image.references.iter().any(|reference| !reference.trim().is_empty()) {
        errors.push(FieldError::required(path.child("imageReferences"), IMAGE_REFERENCE_REQUIRED_MESSAGE));
    }
    let notary = image.verification_type == ImageVerificationType::Notary;
    let attestors_path = path.child("attestors");
    for (index, set) in image.attestors.iter().enumerate() {
        validate_attestor_set(set, &attestors_path.index(index), notary, errors);
    }
    for (index, sets) in image.attestations.iter().enumerate() {
        let attestation_path = path.child("attestations").index(index).child("attestors");
        for (set_index, set) in sets.iter().enumerate() {
            validate_attestor_set(set, &attestation_path.index(set_index), notary, errors);
        }
    }
    if notary && let Some(legacy) = &image.legacy_attestor {
        for entry in &legacy.entries {
            if let Some(message) = notary_violation(entry.keys.is_some(), entry.keyless.is_some()) {
                errors.push(FieldError::invalid(path.clone(), message));
            }
        }
    }
}

/// Checks an attestor set's count and entries.
fn validate_attestor_set(set: &AttestorSet, path: &FieldPath, notary: bool, errors: &mut FieldErrorList) {
    let entries_path = path.child("entries");
    if set.entries.is_empty() {
        errors.push(FieldError::required(entries_path.clone(), "at least one attestor entry is required"));
    }
    if let Some(count) = set.count {
        let in_range = usize::try_from(count).is_ok_and(|count| count >= 1 && count <= set.entries.len());
        if !in_range {
            errors.push(FieldError::invalid(
                path.child("count"),
                "count must be between 1 and the number of entries",
            ));
        }
    }
    for (index, entry) in set.entries.iter().enumerate() {
        let entry_path = entries_path.index(index);
        if !entry.has_descriptor() {
            errors.push(FieldError::required(
                entry_path.clone(),
                "one of keys, certificates, keyless or attestor is required",
            ));
        }
        if notary && let Some(message) = notary_violation(entry.keys.is_some(), entry.keyless.is_some()) {
            errors.push(FieldError::invalid(entry_path, message));
        }
    }
}

/// Returns the notary restriction an attestor entry breaks, if any.
const fn notary_violation(keys: bool, keyless: bool) -> Option<&'static str> {
    match (keys, keyless) {
        (true, true) => Some("Keyless and Keys fields are not allowed for type notary"),
        (false, true) => Some("Keyless field is not allowed for type notary"),
        (true, false) => Some("Keys field is not allowed for type notary"),
        (false, false) => None,
    }
}
