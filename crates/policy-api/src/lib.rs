// crates/policy-api/src/lib.rs
// ============================================================================
// Module: Policy API Library
// Description: Versioned policy schemas, match combinator, structural checks.
// Purpose: Single source of truth for the hub and spoke policy shapes.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! `policy-api` defines the two served schema versions of the admission policy
//! resource: the hub (`kyverno.io/v1`, the storage version) and the spoke
//! (`kyverno.io/v2`). It also owns the version-independent pieces that both
//! versions share: field paths and validation findings, the any/all match
//! combinator, and the structural validator.
//!
//! Every operation in this crate is pure. Cluster knowledge (which kinds are
//! cluster-scoped) arrives through the [`ResourceScope`] snapshot trait.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod schema;
pub mod validation;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use schema::*;
pub use validation::*;
