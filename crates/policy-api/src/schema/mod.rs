// crates/policy-api/src/schema/mod.rs
// ============================================================================
// Module: Policy Schemas
// Description: Shared, hub, and spoke policy types plus the versioned envelope.
// Purpose: Group the per-version schema modules under a single namespace.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The hub and spoke schemas reuse every type in [`common`] verbatim; only the
//! types whose shape differs between versions live in [`hub`] and [`spoke`].

pub mod common;
pub mod hub;
pub mod routing;
pub mod spoke;
pub mod versioned;

pub use common::*;
pub use routing::RoutedFields;
pub use routing::RuleKind;
pub use versioned::ApiVersion;
pub use versioned::POLICY_GROUP;
pub use versioned::PolicyKind;
pub use versioned::SchemaError;
pub use versioned::VersionedPolicy;
