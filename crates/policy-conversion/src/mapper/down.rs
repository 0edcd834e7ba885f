// crates/policy-conversion/src/mapper/down.rs
// ============================================================================
// Module: Hub to Spoke Mapping
// Description: Field-level mapping from the storage schema to the spoke.
// Purpose: Fold every legacy hub field into its spoke representation.
// Dependencies: policy-api
// ============================================================================

//! ## Overview
//! Each function maps one composite. Shared fields are copied structurally.
//! Legacy fields are folded into their modern spoke counterparts:
//! - the inline match filter becomes one extra filter in `any` (or `all`
//!   when `all` is populated);
//! - the single resource `name` is appended to `names`;
//! - `image` is appended to `imageReferences`;
//! - the single-key fields become one synthesized attestor set;
//! - `predicateType` wins over `type` when set.
//!
//! Routed fields stay at their zero values here; the rule converter fills
//! them in once the rule kind is known.

// ============================================================================
// SECTION: Imports
// ============================================================================

use policy_api::FieldPath;
use policy_api::hub;
use policy_api::spoke;

use crate::error::ConversionError;
use crate::mapper::conditions;

// ============================================================================
// SECTION: Rule
// ============================================================================

/// Maps a hub rule; routed fields are left unset.
///
/// # Errors
///
/// Returns [`ConversionError::MalformedConditions`] when a raw condition
/// block under `path` does not parse.
pub fn rule(rule: &hub::Rule, path: &FieldPath) -> Result<spoke::Rule, ConversionError> {
    Ok(spoke::Rule {
        name: rule.name.clone(),
        match_resources: match_resources(&rule.match_resources),
        exclude: rule.exclude.as_ref().map(match_resources),
        context: rule.context.clone(),
        preconditions: conditions::parse_optional(
            rule.preconditions.as_ref(),
            &path.child("preconditions"),
        )?,
        validation: rule
            .validation
            .as_ref()
            .map(|block| validation(block, &path.child("validate")))
            .transpose()?,
        mutation: rule
            .mutation
            .as_ref()
            .map(|block| mutation(block, &path.child("mutate")))
            .transpose()?,
        generation: rule.generation.as_ref().map(generation),
        verify_images: rule.verify_images.iter().map(image_verification).collect(),
    })
}

// ============================================================================
// SECTION: Matching
// ============================================================================

/// Maps a match or exclude block, folding the inline filter into the lists.
#[must_use]
pub fn match_resources(block: &hub::MatchResources) -> spoke::MatchResources {
    let mut any: Vec<spoke::ResourceFilter> = block.any.iter().map(resource_filter).collect();
    let mut all: Vec<spoke::ResourceFilter> = block.all.iter().map(resource_filter).collect();
    if block.has_inline_filter() {
        let inline = spoke::ResourceFilter {
            user_info: block.user_info.clone(),
            resources: resource_description(&block.resources),
        };
        if all.is_empty() {
            any.push(inline);
        } else {
            all.push(inline);
        }
    }
    spoke::MatchResources {
        any,
        all,
    }
}

/// Maps a resource filter.
#[must_use]
pub fn resource_filter(filter: &hub::ResourceFilter) -> spoke::ResourceFilter {
    spoke::ResourceFilter {
        user_info: filter.user_info.clone(),
        resources: resource_description(&filter.resources),
    }
}

/// Maps a resource description, appending the legacy name to `names`.
#[must_use]
pub fn resource_description(description: &hub::ResourceDescription) -> spoke::ResourceDescription {
    let mut names = description.names.clone();
    if !description.name.is_empty() {
        names.push(description.name.clone());
    }
    spoke::ResourceDescription {
        kinds: description.kinds.clone(),
        names,
        namespaces: description.namespaces.clone(),
        annotations: description.annotations.clone(),
        selector: description.selector.clone(),
        namespace_selector: description.namespace_selector.clone(),
        operations: description.operations.clone(),
    }
}

// ============================================================================
// SECTION: Rule Blocks
// ============================================================================

/// Maps a validation block; the failure action and overrides stay unset.
///
/// # Errors
///
/// Returns [`ConversionError::MalformedConditions`] for malformed deny conditions.
pub fn validation(
    block: &hub::Validation,
    path: &FieldPath,
) -> Result<spoke::Validation, ConversionError> {
    let deny = match &block.deny {
        Some(deny) => Some(spoke::Deny {
            conditions: conditions::parse_optional(
                deny.conditions.as_ref(),
                &path.child("deny").child("conditions"),
            )?,
        }),
        None => None,
    };
    Ok(spoke::Validation {
        validation_failure_action: None,
        validation_failure_action_overrides: Vec::new(),
        message: block.message.clone(),
        manifests: block.manifests.clone(),
        for_each: block.for_each.clone(),
        pattern: block.pattern.clone(),
        any_pattern: block.any_pattern.clone(),
        deny,
        pod_security: block.pod_security.clone(),
        cel: block.cel.clone(),
    })
}

/// Maps a mutation block; the mutate-existing trigger stays unset.
///
/// # Errors
///
/// Returns [`ConversionError::MalformedConditions`] for malformed target
/// preconditions.
pub fn mutation(block: &hub::Mutation, path: &FieldPath) -> Result<spoke::Mutation, ConversionError> {
    let targets_path = path.child("targets");
    let targets = block
        .targets
        .iter()
        .enumerate()
        .map(|(index, target)| {
            Ok(spoke::TargetResourceSpec {
                resource: target.resource.clone(),
                context: target.context.clone(),
                preconditions: conditions::parse_optional(
                    target.preconditions.as_ref(),
                    &targets_path.index(index).child("preconditions"),
                )?,
            })
        })
        .collect::<Result<Vec<_>, ConversionError>>()?;
    Ok(spoke::Mutation {
        mutate_existing_on_policy_update: false,
        targets,
        patch_strategic_merge: block.patch_strategic_merge.clone(),
        patches_json6902: block.patches_json6902.clone(),
        for_each: block.for_each.clone(),
    })
}

/// Maps a generation block; the generate-existing trigger stays unset.
#[must_use]
pub fn generation(block: &hub::Generation) -> spoke::Generation {
    spoke::Generation {
        generate_existing: false,
        resource: block.resource.clone(),
        synchronize: block.synchronize,
        orphan_downstream_on_policy_delete: block.orphan_downstream_on_policy_delete,
        data: block.data.clone(),
        clone: block.clone.clone(),
        clone_list: block.clone_list.clone(),
    }
}

// ============================================================================
// SECTION: Image Verification
// ============================================================================

/// Maps an image verification entry, folding the legacy single-key fields.
#[must_use]
pub fn image_verification(entry: &hub::ImageVerification) -> spoke::ImageVerification {
    let mut image_references = entry.image_references.clone();
    if !entry.image.is_empty() {
        image_references.push(entry.image.clone());
    }
    let mut attestors = entry.attestors.clone();
    if let Some(legacy) = entry.legacy_attestor_set() {
        attestors.push(legacy);
    }
    spoke::ImageVerification {
        verification_type: entry.verification_type,
        image_references,
        skip_image_references: entry.skip_image_references.clone(),
        attestors,
        attestations: entry.attestations.iter().map(attestation).collect(),
        repository: entry.repository.clone(),
        mutate_digest: entry.mutate_digest,
        verify_digest: entry.verify_digest,
        required: entry.required,
        image_registry_credentials: entry.image_registry_credentials.clone(),
        use_cache: entry.use_cache,
    }
}

/// Maps an attestation; a set `predicateType` wins over `type`.
#[must_use]
pub fn attestation(entry: &hub::Attestation) -> spoke::Attestation {
    let attestation_type = if entry.predicate_type.is_empty() {
        entry.attestation_type.clone()
    } else {
        entry.predicate_type.clone()
    };
    spoke::Attestation {
        attestation_type,
        attestors: entry.attestors.clone(),
        conditions: entry.conditions.clone(),
    }
}
