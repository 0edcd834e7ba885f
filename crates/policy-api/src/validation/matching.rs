// crates/policy-api/src/validation/matching.rs
// ============================================================================
// Module: Match Combinator
// Description: Any/all resource filter blocks: validation and evaluation.
// Purpose: Give both schema versions one definition of match semantics.
// Dependencies: thiserror, crate::schema
// ============================================================================

//! ## Overview
//! A match (or exclude) block holds resource filters under exactly one of
//! `any` (OR) or `all` (AND). Setting both is an error, never a silent
//! precedence rule. The hub may instead carry one legacy inline filter.
//!
//! [`MatchView`] borrows either schema's block so validation and evaluation
//! are written once. Evaluation leaves the per-filter check to the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use thiserror::Error;

use crate::schema::common::AdmissionOperation;
use crate::schema::common::LabelSelector;
use crate::schema::common::UserInfo;
use crate::schema::hub;
use crate::schema::spoke;
use crate::validation::field::FieldError;
use crate::validation::field::FieldErrorList;
use crate::validation::field::FieldPath;
use crate::validation::scope::ResourceScope;
use crate::validation::scope::is_well_formed_kind;
use crate::validation::scope::kind_name;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Message reported when a block sets both `any` and `all`.
pub const ANY_ALL_CONFLICT_MESSAGE: &str = "Can't specify any and all together";
/// Message reported when a hub block mixes inline filters with `any`/`all`.
pub const INLINE_CONFLICT_MESSAGE: &str =
    "Can't specify any/all together with inline resources or user info";
/// Subject kinds accepted in user info.
const SUBJECT_KINDS: [&str; 3] = ["User", "Group", "ServiceAccount"];
/// Label selector operators.
const SELECTOR_OPERATORS: [&str; 4] = ["In", "NotIn", "Exists", "DoesNotExist"];

// ============================================================================
// SECTION: Views
// ============================================================================

/// Borrowed, version-independent resource filter.
#[derive(Debug, Clone, Copy)]
pub struct FilterView<'a> {
    /// User info constraints.
    pub user_info: &'a UserInfo,
    /// Kind selectors.
    pub kinds: &'a [String],
    /// Deprecated single name; always empty for the spoke.
    pub legacy_name: &'a str,
    /// Resource names.
    pub names: &'a [String],
    /// Namespace names.
    pub namespaces: &'a [String],
    /// Annotation matches.
    pub annotations: &'a BTreeMap<String, String>,
    /// Label selector.
    pub selector: Option<&'a LabelSelector>,
    /// Namespace label selector.
    pub namespace_selector: Option<&'a LabelSelector>,
    /// Admission operations.
    pub operations: &'a [AdmissionOperation],
}

impl<'a> FilterView<'a> {
    /// Views hub user info plus a hub resource description.
    #[must_use]
    pub fn from_hub(user_info: &'a UserInfo, resources: &'a hub::ResourceDescription) -> Self {
        Self {
            user_info,
            kinds: &resources.kinds,
            legacy_name: &resources.name,
            names: &resources.names,
            namespaces: &resources.namespaces,
            annotations: &resources.annotations,
            selector: resources.selector.as_ref(),
            namespace_selector: resources.namespace_selector.as_ref(),
            operations: &resources.operations,
        }
    }

    /// Views a spoke resource filter.
    #[must_use]
    pub fn from_spoke(filter: &'a spoke::ResourceFilter) -> Self {
        let resources = &filter.resources;
        Self {
            user_info: &filter.user_info,
            kinds: &resources.kinds,
            legacy_name: "",
            names: &resources.names,
            namespaces: &resources.namespaces,
            annotations: &resources.annotations,
            selector: resources.selector.as_ref(),
            namespace_selector: resources.namespace_selector.as_ref(),
            operations: &resources.operations,
        }
    }

    /// Returns true when the filter constrains nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.user_info.is_empty()
            && self.kinds.is_empty()
            && self.legacy_name.is_empty()
            && self.names.is_empty()
            && self.namespaces.is_empty()
            && self.annotations.is_empty()
            && self.selector.is_none()
            && self.namespace_selector.is_none()
            && self.operations.is_empty()
    }
}

/// Borrowed, version-independent match or exclude block.
#[derive(Debug, Clone, Default)]
pub struct MatchView<'a> {
    /// Filters combined with OR.
    pub any: Vec<FilterView<'a>>,
    /// Filters combined with AND.
    pub all: Vec<FilterView<'a>>,
    /// Legacy inline filter (hub only).
    pub inline: Option<FilterView<'a>>,
}

impl MatchView<'_> {
    /// Returns true when nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.any.is_empty() && self.all.is_empty() && self.inline.is_none()
    }
}

impl<'a> From<&'a hub::MatchResources> for MatchView<'a> {
    fn from(block: &'a hub::MatchResources) -> Self {
        let view_filter =
            |filter: &'a hub::ResourceFilter| FilterView::from_hub(&filter.user_info, &filter.resources);
        Self {
            any: block.any.iter().map(view_filter).collect(),
            all: block.all.iter().map(view_filter).collect(),
            inline: block
                .has_inline_filter()
                .then(|| FilterView::from_hub(&block.user_info, &block.resources)),
        }
    }
}

impl<'a> From<&'a spoke::MatchResources> for MatchView<'a> {
    fn from(block: &'a spoke::MatchResources) -> Self {
        Self {
            any: block.any.iter().map(FilterView::from_spoke).collect(),
            all: block.all.iter().map(FilterView::from_spoke).collect(),
            inline: None,
        }
    }
}

// ============================================================================
// SECTION: Context
// ============================================================================

/// Processing mode the block is validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Admission-time only; user info is available.
    Admission,
    /// Background scans run; no requesting user exists, so user info is forbidden.
    Background,
}

impl MatchMode {
    /// Selects the mode from a policy's background flag (unset means enabled).
    #[must_use]
    pub const fn for_background(background: Option<bool>) -> Self {
        match background {
            Some(false) => Self::Admission,
            _ => Self::Background,
        }
    }
}

/// Scope of the policy owning the block.
#[derive(Clone, Copy)]
pub struct MatchScope<'a> {
    /// True for a namespaced policy.
    pub namespaced: bool,
    /// The policy's namespace, if it has one.
    pub namespace: Option<&'a str>,
    /// Cluster-scope snapshot.
    pub resources: &'a dyn ResourceScope,
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates a match or exclude block rooted at `path`.
///
/// The any/all conflict is reported at `path` itself before any filter is
/// inspected; filter findings follow in document order.
#[must_use]
pub fn validate_match(
    view: &MatchView<'_>,
    path: &FieldPath,
    mode: MatchMode,
    scope: &MatchScope<'_>,
) -> FieldErrorList {
    let mut errors = FieldErrorList::new();
    if !view.any.is_empty() && !view.all.is_empty() {
        errors.push(FieldError::invalid(path.clone(), ANY_ALL_CONFLICT_MESSAGE));
    }
    if view.inline.is_some() && (!view.any.is_empty() || !view.all.is_empty()) {
        errors.push(FieldError::invalid(path.clone(), INLINE_CONFLICT_MESSAGE));
    }
    for (index, filter) in view.any.iter().enumerate() {
        validate_filter(filter, &path.child("any").index(index), mode, scope, &mut errors);
    }
    for (index, filter) in view.all.iter().enumerate() {
        validate_filter(filter, &path.child("all").index(index), mode, scope, &mut errors);
    }
    if let Some(filter) = &view.inline {
        validate_filter(filter, path, mode, scope, &mut errors);
    }
    errors
}

/// Validates one resource filter.
fn validate_filter(
    filter: &FilterView<'_>,
    path: &FieldPath,
    mode: MatchMode,
    scope: &MatchScope<'_>,
    errors: &mut FieldErrorList,
) {
    if filter.is_empty() {
        errors.push(FieldError::required(
            path.clone(),
            "at least one element must be specified in a filter block",
        ));
        return;
    }
    validate_user_info(filter.user_info, path, mode, errors);
    validate_resources(filter, &path.child("resources"), scope, errors);
}

/// Validates user info constraints for the processing mode.
fn validate_user_info(
    user_info: &UserInfo,
    path: &FieldPath,
    mode: MatchMode,
    errors: &mut FieldErrorList,
) {
    if mode == MatchMode::Background {
        let populated = [
            ("roles", !user_info.roles.is_empty()),
            ("clusterRoles", !user_info.cluster_roles.is_empty()),
            ("subjects", !user_info.subjects.is_empty()),
        ];
        for (field, set) in populated {
            if set {
                errors.push(FieldError::forbidden(
                    path.child(field),
                    format!("{field} is not allowed when background processing is enabled"),
                ));
            }
        }
        return;
    }
    for (index, subject) in user_info.subjects.iter().enumerate() {
        let subject_path = path.child("subjects").index(index);
        if !SUBJECT_KINDS.contains(&subject.kind.as_str()) {
            errors.push(FieldError::not_supported(
                subject_path.child("kind"),
                format!("subject kind must be one of {}", SUBJECT_KINDS.join(", ")),
            ));
        }
        if subject.name.trim().is_empty() {
            errors.push(FieldError::required(subject_path.child("name"), "subject name is required"));
        }
        if subject.kind == "ServiceAccount" && subject.namespace.trim().is_empty() {
            errors.push(FieldError::required(
                subject_path.child("namespace"),
                "namespace is required for ServiceAccount subjects",
            ));
        }
    }
}

/// Validates the resource half of a filter.
fn validate_resources(
    filter: &FilterView<'_>,
    path: &FieldPath,
    scope: &MatchScope<'_>,
    errors: &mut FieldErrorList,
) {
    if !filter.legacy_name.is_empty() && !filter.names.is_empty() {
        errors.push(FieldError::invalid(
            path.clone(),
            "name and names cannot be specified together",
        ));
    }
    for (index, selector) in filter.kinds.iter().enumerate() {
        let kind_path = path.child("kinds").index(index);
        if !is_well_formed_kind(selector) {
            errors.push(FieldError::invalid(
                kind_path,
                format!("kind selector '{selector}' must have 1 to 4 non-empty segments"),
            ));
            continue;
        }
        let kind = kind_name(selector);
        if scope.namespaced && scope.resources.is_cluster_scoped(kind) {
            errors.push(FieldError::forbidden(
                kind_path,
                format!("cluster-scoped kind {kind} cannot be matched by a namespaced policy"),
            ));
        }
    }
    if scope.namespaced
        && let Some(own) = scope.namespace
    {
        for (index, namespace) in filter.namespaces.iter().enumerate() {
            if namespace != own {
                errors.push(FieldError::forbidden(
                    path.child("namespaces").index(index),
                    format!("a namespaced policy can only match resources in namespace {own}"),
                ));
            }
        }
    }
    if filter.annotations.keys().any(|key| key.trim().is_empty()) {
        errors.push(FieldError::invalid(
            path.child("annotations"),
            "annotation keys must be non-empty",
        ));
    }
    if let Some(selector) = filter.selector {
        validate_selector(selector, &path.child("selector"), errors);
    }
    if let Some(selector) = filter.namespace_selector {
        validate_selector(selector, &path.child("namespaceSelector"), errors);
    }
}

/// Validates label selector structure.
pub fn validate_selector(selector: &LabelSelector, path: &FieldPath, errors: &mut FieldErrorList) {
    if selector.match_labels.keys().any(|key| key.trim().is_empty()) {
        errors.push(FieldError::invalid(path.child("matchLabels"), "label keys must be non-empty"));
    }
    for (index, requirement) in selector.match_expressions.iter().enumerate() {
        let requirement_path = path.child("matchExpressions").index(index);
        if requirement.key.trim().is_empty() {
            errors.push(FieldError::required(requirement_path.child("key"), "key is required"));
        }
        match requirement.operator.as_str() {
            "In" | "NotIn" if requirement.values.is_empty() => {
                errors.push(FieldError::required(
                    requirement_path.child("values"),
                    format!("values must be non-empty for operator {}", requirement.operator),
                ));
            }
            "Exists" | "DoesNotExist" if !requirement.values.is_empty() => {
                errors.push(FieldError::forbidden(
                    requirement_path.child("values"),
                    format!("values must be empty for operator {}", requirement.operator),
                ));
            }
            operator if !SELECTOR_OPERATORS.contains(&operator) => {
                errors.push(FieldError::not_supported(
                    requirement_path.child("operator"),
                    format!("operator must be one of {}", SELECTOR_OPERATORS.join(", ")),
                ));
            }
            _ => {}
        }
    }
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Refusal to evaluate a block whose filter lists conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MatchConflict {
    /// Both `any` and `all` are populated.
    #[error("Can't specify any and all together")]
    AnyAndAll,
    /// A legacy inline filter sits next to `any` or `all`.
    #[error("Can't specify any/all together with inline resources or user info")]
    InlineWithLists,
}

/// Evaluates a block given a per-filter verdict.
///
/// `any` matches when some filter matches, `all` when every filter matches,
/// and a legacy inline filter when it matches. An empty block matches
/// nothing. Evaluation short-circuits in document order.
///
/// # Errors
///
/// Returns [`MatchConflict`] for blocks validation would reject.
pub fn evaluate<'a, F>(view: &MatchView<'a>, mut matches: F) -> Result<bool, MatchConflict>
where
    F: FnMut(&FilterView<'a>) -> bool,
{
    let has_lists = !view.any.is_empty() || !view.all.is_empty();
    if !view.any.is_empty() && !view.all.is_empty() {
        return Err(MatchConflict::AnyAndAll);
    }
    if view.inline.is_some() && has_lists {
        return Err(MatchConflict::InlineWithLists);
    }
    if !view.any.is_empty() {
        return Ok(view.any.iter().any(&mut matches));
    }
    if !view.all.is_empty() {
        return Ok(view.all.iter().all(&mut matches));
    }
    Ok(view.inline.as_ref().is_some_and(matches))
}
