// crates/policy-conversion/src/review.rs
// ============================================================================
// Module: Conversion Review Protocol
// Description: ConversionReview request/response types and batch handling.
// Purpose: Convert a batch all-or-nothing, preserving order and UIDs.
// Dependencies: policy-api, policy-config, serde, serde_json
// ============================================================================

//! ## Overview
//! A review carries one target version and an ordered list of objects. The
//! handler either returns every object converted, in request order, or no
//! objects and a `Failure` status reading
//! `cannot convert to requested version: <cause>`. Batch and object sizes are
//! bounded before any conversion runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use policy_config::ConfigError;
use policy_config::PolicyConversionConfig;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::audit::AuditOutcome;
use crate::audit::ConversionAuditEvent;
use crate::audit::ConversionAuditEventParams;
use crate::audit::ConversionAuditSink;
use crate::director::Converter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// API version of the review envelope.
pub const CONVERSION_REVIEW_API_VERSION: &str = "apiextensions.k8s.io/v1";
/// Kind of the review envelope.
pub const CONVERSION_REVIEW_KIND: &str = "ConversionReview";
/// Prefix of every batch failure message.
pub const CONVERSION_FAILURE_PREFIX: &str = "cannot convert to requested version";
/// Status reported for a converted batch.
const STATUS_SUCCESS: &str = "Success";
/// Status reported for a failed batch.
const STATUS_FAILURE: &str = "Failure";

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Conversion review envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReview {
    /// Envelope API version.
    pub api_version: String,
    /// Envelope kind.
    pub kind: String,
    /// Request, present on the way in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<ConversionRequest>,
    /// Response, present on the way out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ConversionResponse>,
}

/// Batch conversion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRequest {
    /// Request identifier, echoed in the response.
    pub uid: String,
    /// Target `group/version` for every object.
    #[serde(rename = "desiredAPIVersion")]
    pub desired_api_version: String,
    /// Objects to convert, in order.
    #[serde(default)]
    pub objects: Vec<Value>,
}

/// Batch conversion response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResponse {
    /// Request identifier.
    pub uid: String,
    /// Converted objects in request order; empty on failure.
    #[serde(default)]
    pub converted_objects: Vec<Value>,
    /// Batch status.
    pub result: ReviewStatus,
}

/// Batch status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewStatus {
    /// `Success` or `Failure`.
    pub status: String,
    /// Failure message.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl ReviewStatus {
    /// Returns true for a successful batch.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors that prevent producing any review response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    /// The review has no request.
    #[error("conversion review has no request")]
    MissingRequest,
    /// The review bytes do not decode.
    #[error("failed to decode conversion review: {0}")]
    Decode(String),
    /// The response could not be encoded.
    #[error("failed to encode conversion review: {0}")]
    Encode(String),
}

// ============================================================================
// SECTION: Handler
// ============================================================================

/// Batch limits enforced before conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewLimits {
    /// Maximum objects per review.
    pub max_batch_objects: usize,
    /// Maximum encoded size of one object in bytes.
    pub max_object_bytes: usize,
}

impl Default for ReviewLimits {
    fn default() -> Self {
        let defaults = PolicyConversionConfig::default();
        Self {
            max_batch_objects: defaults.conversion.max_batch_objects,
            max_object_bytes: defaults.conversion.max_object_bytes,
        }
    }
}

/// Batch failure before it is rendered into a status.
struct BatchFailure {
    /// Normalized error kind label.
    kind: &'static str,
    /// Failure cause.
    cause: String,
}

/// Converted batch with side-channel counters.
struct BatchOutput {
    /// Converted objects in request order.
    objects: Vec<Value>,
    /// Objects that had side-channel data applied.
    restored: usize,
    /// Objects that received a stashed payload.
    stashed: usize,
}

/// Handles conversion reviews all-or-nothing.
pub struct ReviewHandler {
    /// Object converter.
    converter: Converter,
    /// Batch limits.
    limits: ReviewLimits,
    /// Audit sink.
    audit: Arc<dyn ConversionAuditSink>,
}

impl ReviewHandler {
    /// Creates a handler.
    #[must_use]
    pub fn new(
        converter: Converter,
        limits: ReviewLimits,
        audit: Arc<dyn ConversionAuditSink>,
    ) -> Self {
        Self {
            converter,
            limits,
            audit,
        }
    }

    /// Creates a handler from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the served versions are invalid.
    pub fn from_config(
        config: &PolicyConversionConfig,
        audit: Arc<dyn ConversionAuditSink>,
    ) -> Result<Self, ConfigError> {
        let limits = ReviewLimits {
            max_batch_objects: config.conversion.max_batch_objects,
            max_object_bytes: config.conversion.max_object_bytes,
        };
        Ok(Self::new(Converter::from_config(&config.conversion)?, limits, audit))
    }

    /// Handles a decoded review.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::MissingRequest`] when the review has no request.
    pub fn handle(&self, review: &ConversionReview) -> Result<ConversionReview, ReviewError> {
        let request = review.request.as_ref().ok_or(ReviewError::MissingRequest)?;
        let (response, event) = match self.convert_batch(request) {
            Ok(output) => {
                let event = ConversionAuditEvent::new(ConversionAuditEventParams {
                    request_uid: request.uid.clone(),
                    desired_api_version: request.desired_api_version.clone(),
                    object_count: request.objects.len(),
                    converted_count: output.objects.len(),
                    restored_count: output.restored,
                    stashed_count: output.stashed,
                    outcome: AuditOutcome::Success,
                    error_kind: None,
                    message: None,
                });
                let response = ConversionResponse {
                    uid: request.uid.clone(),
                    converted_objects: output.objects,
                    result: ReviewStatus {
                        status: STATUS_SUCCESS.to_string(),
                        message: String::new(),
                    },
                };
                (response, event)
            }
            Err(failure) => {
                let message = format!("{CONVERSION_FAILURE_PREFIX}: {}", failure.cause);
                let event = ConversionAuditEvent::new(ConversionAuditEventParams {
                    request_uid: request.uid.clone(),
                    desired_api_version: request.desired_api_version.clone(),
                    object_count: request.objects.len(),
                    converted_count: 0,
                    restored_count: 0,
                    stashed_count: 0,
                    outcome: AuditOutcome::Failure,
                    error_kind: Some(failure.kind),
                    message: Some(message.clone()),
                });
                let response = ConversionResponse {
                    uid: request.uid.clone(),
                    converted_objects: Vec::new(),
                    result: ReviewStatus {
                        status: STATUS_FAILURE.to_string(),
                        message,
                    },
                };
                (response, event)
            }
        };
        self.audit.record(&event);
        Ok(ConversionReview {
            api_version: review.api_version.clone(),
            kind: CONVERSION_REVIEW_KIND.to_string(),
            request: None,
            response: Some(response),
        })
    }

    /// Handles an encoded review and returns the encoded response.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError`] when decoding or encoding fails, or when the
    /// review has no request.
    pub fn handle_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>, ReviewError> {
        let review: ConversionReview =
            serde_json::from_slice(bytes).map_err(|err| ReviewError::Decode(err.to_string()))?;
        let response = self.handle(&review)?;
        serde_json::to_vec(&response).map_err(|err| ReviewError::Encode(err.to_string()))
    }

    /// Converts every object or fails the whole batch.
    fn convert_batch(&self, request: &ConversionRequest) -> Result<BatchOutput, BatchFailure> {
        if request.objects.len() > self.limits.max_batch_objects {
            return Err(BatchFailure {
                kind: "batch_too_large",
                cause: format!(
                    "batch of {} objects exceeds limit of {}",
                    request.objects.len(),
                    self.limits.max_batch_objects
                ),
            });
        }
        self.converter.resolve(&request.desired_api_version).map_err(|err| BatchFailure {
            kind: err.kind(),
            cause: err.to_string(),
        })?;
        let mut output = BatchOutput {
            objects: Vec::with_capacity(request.objects.len()),
            restored: 0,
            stashed: 0,
        };
        for (index, object) in request.objects.iter().enumerate() {
            let size = serde_json::to_vec(object)
                .map_err(|err| BatchFailure {
                    kind: "encode",
                    cause: format!("objects[{index}]: {err}"),
                })?
                .len();
            if size > self.limits.max_object_bytes {
                return Err(BatchFailure {
                    kind: "object_too_large",
                    cause: format!(
                        "objects[{index}]: {size} bytes exceeds limit of {}",
                        self.limits.max_object_bytes
                    ),
                });
            }
            let conversion = self
                .converter
                .convert_value(object.clone(), &request.desired_api_version)
                .map_err(|err| BatchFailure {
                    kind: err.kind(),
                    cause: format!("objects[{index}]: {err}"),
                })?;
            let rendered = conversion.policy.to_value().map_err(|err| BatchFailure {
                kind: "encode",
                cause: format!("objects[{index}]: {err}"),
            })?;
            output.restored += usize::from(conversion.restored);
            output.stashed += usize::from(conversion.stashed);
            output.objects.push(rendered);
        }
        Ok(output)
    }
}
