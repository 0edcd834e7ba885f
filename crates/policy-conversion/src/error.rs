// crates/policy-conversion/src/error.rs
// ============================================================================
// Module: Conversion Errors
// Description: Terminal errors raised while converting a policy object.
// Purpose: Give every conversion failure one value and one stable label.
// Dependencies: policy-api, thiserror
// ============================================================================

//! ## Overview
//! Conversion either produces a fully populated object or exactly one
//! [`ConversionError`]. There is no partial output. Structural problems with
//! a policy are not conversion errors; they are validation findings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use policy_api::FieldPath;
use policy_api::SchemaError;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Terminal conversion failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// The source or desired version is unknown or not served.
    #[error("unsupported apiVersion: {0}")]
    UnsupportedVersion(String),
    /// The source document does not decode into its schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// A raw condition block is neither an any/all object nor a list.
    #[error("malformed conditions at {path}: {message}")]
    MalformedConditions {
        /// Path of the condition block.
        path: FieldPath,
        /// Decoder message.
        message: String,
    },
    /// The side-channel annotation does not hold a usable payload.
    #[error("malformed conversion payload: {0}")]
    MalformedPayload(String),
    /// A converted value could not be serialized.
    #[error("failed to encode converted value: {0}")]
    Encode(String),
}

impl ConversionError {
    /// Returns a stable label for audit records.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedVersion(_) | Self::Schema(SchemaError::UnsupportedVersion(_)) => {
                "unsupported_version"
            }
            Self::Schema(_) => "malformed_object",
            Self::MalformedConditions {
                ..
            } => "malformed_conditions",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::Encode(_) => "encode",
        }
    }
}
