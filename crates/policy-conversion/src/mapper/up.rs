// crates/policy-conversion/src/mapper/up.rs
// ============================================================================
// Module: Spoke to Hub Mapping
// Description: Field-level mapping from the spoke schema to the storage hub.
// Purpose: Render every spoke field the hub has a peer for.
// Dependencies: policy-api
// ============================================================================

//! ## Overview
//! Spoke fields map onto their modern hub peers; hub legacy fields stay
//! empty. Typed condition blocks are rendered back into raw `{any, all}`
//! objects. Per-rule routed values and overrides are dropped here; the rule
//! converter aggregates the routed ones onto the hub policy.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use policy_api::UserInfo;
use policy_api::hub;
use policy_api::spoke;

use crate::error::ConversionError;
use crate::mapper::conditions;

// ============================================================================
// SECTION: Rule
// ============================================================================

/// Maps a spoke rule; per-rule routed values are dropped.
///
/// # Errors
///
/// Returns [`ConversionError::Encode`] when a condition block cannot be rendered.
pub fn rule(rule: &spoke::Rule) -> Result<hub::Rule, ConversionError> {
    Ok(hub::Rule {
        name: rule.name.clone(),
        match_resources: match_resources(&rule.match_resources),
        exclude: rule.exclude.as_ref().map(match_resources),
        context: rule.context.clone(),
        preconditions: conditions::render_optional(rule.preconditions.as_ref())?,
        validation: rule.validation.as_ref().map(validation).transpose()?,
        mutation: rule.mutation.as_ref().map(mutation).transpose()?,
        generation: rule.generation.as_ref().map(generation),
        verify_images: rule.verify_images.iter().map(image_verification).collect(),
    })
}

// ============================================================================
// SECTION: Matching
// ============================================================================

/// Maps a match or exclude block; the legacy inline filter stays empty.
#[must_use]
pub fn match_resources(block: &spoke::MatchResources) -> hub::MatchResources {
    hub::MatchResources {
        any: block.any.iter().map(resource_filter).collect(),
        all: block.all.iter().map(resource_filter).collect(),
        user_info: UserInfo::default(),
        resources: hub::ResourceDescription::default(),
    }
}

/// Maps a resource filter.
#[must_use]
pub fn resource_filter(filter: &spoke::ResourceFilter) -> hub::ResourceFilter {
    hub::ResourceFilter {
        user_info: filter.user_info.clone(),
        resources: resource_description(&filter.resources),
    }
}

/// Maps a resource description; the legacy `name` stays empty.
#[must_use]
pub fn resource_description(description: &spoke::ResourceDescription) -> hub::ResourceDescription {
    hub::ResourceDescription {
        kinds: description.kinds.clone(),
        name: String::new(),
        names: description.names.clone(),
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

/// Maps a validation block, rendering deny conditions.
///
/// # Errors
///
/// Returns [`ConversionError::Encode`] when the deny block cannot be rendered.
pub fn validation(block: &spoke::Validation) -> Result<hub::Validation, ConversionError> {
    let deny = match &block.deny {
        Some(deny) => Some(hub::Deny {
            conditions: conditions::render_optional(deny.conditions.as_ref())?,
        }),
        None => None,
    };
    Ok(hub::Validation {
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

/// Maps a mutation block, rendering target preconditions.
///
/// # Errors
///
/// Returns [`ConversionError::Encode`] when a precondition block cannot be rendered.
pub fn mutation(block: &spoke::Mutation) -> Result<hub::Mutation, ConversionError> {
    let targets = block
        .targets
        .iter()
        .map(|target| {
            Ok(hub::TargetResourceSpec {
                resource: target.resource.clone(),
                context: target.context.clone(),
                preconditions: conditions::render_optional(target.preconditions.as_ref())?,
            })
        })
        .collect::<Result<Vec<_>, ConversionError>>()?;
    Ok(hub::Mutation {
        targets,
        patch_strategic_merge: block.patch_strategic_merge.clone(),
        patches_json6902: block.patches_json6902.clone(),
        for_each: block.for_each.clone(),
    })
}

/// Maps a generation block.
#[must_use]
pub fn generation(block: &spoke::Generation) -> hub::Generation {
    hub::Generation {
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

/// Maps an image verification entry; legacy single-key fields stay empty.
#[must_use]
pub fn image_verification(entry: &spoke::ImageVerification) -> hub::ImageVerification {
    hub::ImageVerification {
        verification_type: entry.verification_type,
        image: String::new(),
        image_references: entry.image_references.clone(),
        skip_image_references: entry.skip_image_references.clone(),
        key: String::new(),
        roots: String::new(),
        subject: String::new(),
        issuer: String::new(),
        additional_extensions: BTreeMap::new(),
        attestors: entry.attestors.clone(),
        attestations: entry.attestations.iter().map(attestation).collect(),
        annotations: BTreeMap::new(),
        repository: entry.repository.clone(),
        mutate_digest: entry.mutate_digest,
        verify_digest: entry.verify_digest,
        required: entry.required,
        image_registry_credentials: entry.image_registry_credentials.clone(),
        use_cache: entry.use_cache,
    }
}

/// Maps an attestation; the legacy `predicateType` stays empty.
#[must_use]
pub fn attestation(entry: &spoke::Attestation) -> hub::Attestation {
    hub::Attestation {
        predicate_type: String::new(),
        attestation_type: entry.attestation_type.clone(),
        attestors: entry.attestors.clone(),
        conditions: entry.conditions.clone(),
    }
}
