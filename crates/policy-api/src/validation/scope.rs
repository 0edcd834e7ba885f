// crates/policy-api/src/validation/scope.rs
// ============================================================================
// Module: Resource Scope Snapshot
// Description: Read-only knowledge of which kinds are cluster-scoped.
// Purpose: Keep validation pure by injecting cluster discovery data.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Namespaced policies may not select cluster-scoped kinds. Whether a kind is
//! cluster-scoped is cluster knowledge, so validation asks a [`ResourceScope`]
//! snapshot instead of performing discovery itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Built-in cluster-scoped kinds used when no snapshot is configured.
pub const BUILTIN_CLUSTER_SCOPED_KINDS: &[&str] = &[
    "APIService",
    "CertificateSigningRequest",
    "ClusterPolicy",
    "ClusterRole",
    "ClusterRoleBinding",
    "CustomResourceDefinition",
    "IngressClass",
    "MutatingWebhookConfiguration",
    "Namespace",
    "Node",
    "PersistentVolume",
    "PriorityClass",
    "RuntimeClass",
    "StorageClass",
    "ValidatingAdmissionPolicy",
    "ValidatingAdmissionPolicyBinding",
    "ValidatingWebhookConfiguration",
    "VolumeAttachment",
];

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Snapshot answering whether a kind is cluster-scoped.
pub trait ResourceScope: Send + Sync {
    /// Returns true when the kind is cluster-scoped.
    ///
    /// `kind` is the bare kind name, already stripped of group, version and
    /// subresource.
    fn is_cluster_scoped(&self, kind: &str) -> bool;
}

/// Fixed set of cluster-scoped kind names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticResourceScope {
    /// Cluster-scoped kind names.
    kinds: BTreeSet<String>,
}

impl StaticResourceScope {
    /// Builds a snapshot from kind names.
    #[must_use]
    pub fn new<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kinds: kinds.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds a snapshot from [`BUILTIN_CLUSTER_SCOPED_KINDS`].
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(BUILTIN_CLUSTER_SCOPED_KINDS.iter().copied())
    }
}

impl ResourceScope for StaticResourceScope {
    fn is_cluster_scoped(&self, kind: &str) -> bool {
        self.kinds.contains(kind)
    }
}

// ============================================================================
// SECTION: Kind Selectors
// ============================================================================

/// Extracts the bare kind from a kind selector.
///
/// Selectors take the forms `Kind`, `version/Kind`, `group/version/Kind`, and
/// any of those followed by `/subresource`. The kind is the first segment
/// that starts with an uppercase letter or is a wildcard.
#[must_use]
pub fn kind_name(selector: &str) -> &str {
    selector
        .split('/')
        .find(|segment| {
            segment.starts_with(|c: char| c.is_ascii_uppercase()) || segment.starts_with('*')
        })
        .unwrap_or(selector)
}

/// Returns true when a kind selector has one to four non-empty segments.
#[must_use]
pub fn is_well_formed_kind(selector: &str) -> bool {
    let segments: Vec<&str> = selector.split('/').collect();
    (1 ..= 4).contains(&segments.len()) && segments.iter().all(|segment| !segment.trim().is_empty())
}
