// crates/policy-config/src/lib.rs
// ============================================================================
// Module: Policy Config Library
// Description: Canonical config model and validation for policy conversion.
// Purpose: Single source of truth for policy-conversion.toml semantics.
// Dependencies: policy-api, serde, toml
// ============================================================================

//! ## Overview
//! `policy-config` defines the configuration model for the conversion
//! service and its tooling: served versions, batch limits, the cluster-scope
//! snapshot used by validation, and audit sink selection. Validation is
//! strict and fail-closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
