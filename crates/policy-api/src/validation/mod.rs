// crates/policy-api/src/validation/mod.rs
// ============================================================================
// Module: Policy Validation
// Description: Field paths, match combinator, and structural validator.
// Purpose: Collect every structural finding for a policy in one pass.
// Dependencies: crate::schema
// ============================================================================

//! ## Overview
//! Validation is pure and total: it never fails, it returns a (possibly
//! empty) list of [`FieldError`] findings.

pub mod field;
pub mod matching;
pub mod scope;
pub mod structural;

pub use field::FieldError;
pub use field::FieldErrorKind;
pub use field::FieldErrorList;
pub use field::FieldPath;
pub use matching::FilterView;
pub use matching::MatchConflict;
pub use matching::MatchMode;
pub use matching::MatchScope;
pub use matching::MatchView;
pub use matching::evaluate;
pub use matching::validate_match;
pub use matching::validate_selector;
pub use scope::BUILTIN_CLUSTER_SCOPED_KINDS;
pub use scope::ResourceScope;
pub use scope::StaticResourceScope;
pub use scope::kind_name;
pub use structural::validate_hub;
pub use structural::validate_policy;
pub use structural::validate_rule_names;
pub use structural::validate_spoke;
pub use structural::validate_webhook_timeout;
