// crates/policy-conversion/src/lib.rs
// ============================================================================
// Module: Policy Conversion Library
// Description: Multi-version conversion for the admission policy resource.
// Purpose: Convert policies between the hub and the spoke without loss.
// Dependencies: policy-api, policy-config, serde, serde_jcs, serde_json
// ============================================================================

//! ## Overview
//! Layers, leaves first:
//! - [`mapper`]: per-field mapping in both directions plus the static field
//!   mapping table;
//! - [`rules`]: composition across a policy's rules with rule-kind routing;
//! - [`side_channel`]: stash, restore, and overlay of data the peer schema
//!   cannot hold;
//! - [`director`]: whole-object conversion;
//! - [`review`]: the all-or-nothing `ConversionReview` batch protocol.
//!
//! Everything below [`review`] is synchronous, pure, and holds no shared
//! mutable state, so any number of conversions may run concurrently.

pub mod audit;
pub mod director;
pub mod error;
pub mod mapper;
pub mod review;
pub mod rules;
pub mod side_channel;

pub use audit::AuditOutcome;
pub use audit::ConversionAuditEvent;
pub use audit::ConversionAuditEventParams;
pub use audit::ConversionAuditSink;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use audit::ValidationAuditEvent;
pub use audit::ValidationAuditEventParams;
pub use audit::sink_from_config;
pub use director::Conversion;
pub use director::Converter;
pub use director::hub_to_spoke;
pub use director::spoke_to_hub;
pub use error::ConversionError;
pub use review::CONVERSION_FAILURE_PREFIX;
pub use review::CONVERSION_REVIEW_API_VERSION;
pub use review::CONVERSION_REVIEW_KIND;
pub use review::ConversionRequest;
pub use review::ConversionResponse;
pub use review::ConversionReview;
pub use review::ReviewError;
pub use review::ReviewHandler;
pub use review::ReviewLimits;
pub use review::ReviewStatus;
pub use side_channel::SIDE_CHANNEL_ANNOTATION;
