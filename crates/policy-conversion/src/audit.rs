// crates/policy-conversion/src/audit.rs
// ============================================================================
// Module: Conversion Audit Logging
// Description: Structured audit events for conversion reviews and validation.
// Purpose: Emit JSON-line audit records without a logging framework.
// Dependencies: policy-config, serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events are plain serializable structs recorded through a
//! [`ConversionAuditSink`]. Sinks write one JSON object per line to stderr
//! or to an append-only file; the no-op sink discards everything. The pure
//! conversion and validation components never record events themselves.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use policy_config::AuditConfig;
use policy_config::AuditSinkKind;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Outcome label of an audited operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// Every object converted, or no findings.
    Success,
    /// The batch failed, or findings were reported.
    Failure,
}

/// Conversion review audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Review request UID.
    pub request_uid: String,
    /// Requested target version.
    pub desired_api_version: String,
    /// Objects in the request.
    pub object_count: usize,
    /// Objects returned in the response.
    pub converted_count: usize,
    /// Objects that had side-channel data applied.
    pub restored_count: usize,
    /// Objects that received a stashed payload.
    pub stashed_count: usize,
    /// Batch outcome.
    pub outcome: AuditOutcome,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Failure message returned to the caller.
    pub message: Option<String>,
}

/// Inputs required to construct a conversion audit event.
pub struct ConversionAuditEventParams {
    /// Review request UID.
    pub request_uid: String,
    /// Requested target version.
    pub desired_api_version: String,
    /// Objects in the request.
    pub object_count: usize,
    /// Objects returned in the response.
    pub converted_count: usize,
    /// Objects that had side-channel data applied.
    pub restored_count: usize,
    /// Objects that received a stashed payload.
    pub stashed_count: usize,
    /// Batch outcome.
    pub outcome: AuditOutcome,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Failure message returned to the caller.
    pub message: Option<String>,
}

impl ConversionAuditEvent {
    /// Creates a new audit event with a consistent timestamp.
    #[must_use]
    pub fn new(params: ConversionAuditEventParams) -> Self {
        Self {
            event: "conversion_review",
            timestamp_ms: now_ms(),
            request_uid: params.request_uid,
            desired_api_version: params.desired_api_version,
            object_count: params.object_count,
            converted_count: params.converted_count,
            restored_count: params.restored_count,
            stashed_count: params.stashed_count,
            outcome: params.outcome,
            error_kind: params.error_kind,
            message: params.message,
        }
    }
}

/// Policy validation audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Schema version of the validated object.
    pub api_version: String,
    /// Policy name.
    pub name: String,
    /// Policy namespace for namespaced policies.
    pub namespace: Option<String>,
    /// Validation outcome.
    pub outcome: AuditOutcome,
    /// Number of findings.
    pub finding_count: usize,
    /// Rendered findings, in report order.
    pub findings: Vec<String>,
}

/// Inputs required to construct a validation audit event.
pub struct ValidationAuditEventParams {
    /// Schema version of the validated object.
    pub api_version: String,
    /// Policy name.
    pub name: String,
    /// Policy namespace for namespaced policies.
    pub namespace: Option<String>,
    /// Rendered findings, in report order.
    pub findings: Vec<String>,
}

impl ValidationAuditEvent {
    /// Creates a new validation audit event with a consistent timestamp.
    #[must_use]
    pub fn new(params: ValidationAuditEventParams) -> Self {
        let outcome =
            if params.findings.is_empty() { AuditOutcome::Success } else { AuditOutcome::Failure };
        Self {
            event: "policy_validation",
            timestamp_ms: now_ms(),
            api_version: params.api_version,
            name: params.name,
            namespace: params.namespace,
            outcome,
            finding_count: params.findings.len(),
            findings: params.findings,
        }
    }
}

/// Milliseconds since the epoch, zero if the clock is before it.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for conversion and validation events.
pub trait ConversionAuditSink: Send + Sync {
    /// Record a conversion review event.
    fn record(&self, event: &ConversionAuditEvent);

    /// Record a validation event.
    fn record_validation(&self, _event: &ValidationAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl ConversionAuditSink for StderrAuditSink {
    fn record(&self, event: &ConversionAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }

    fn record_validation(&self, event: &ValidationAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialized line.
    fn write_line<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl ConversionAuditSink for FileAuditSink {
    fn record(&self, event: &ConversionAuditEvent) {
        self.write_line(event);
    }

    fn record_validation(&self, event: &ValidationAuditEvent) {
        self.write_line(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl ConversionAuditSink for NoopAuditSink {
    fn record(&self, _event: &ConversionAuditEvent) {}

    fn record_validation(&self, _event: &ValidationAuditEvent) {}
}

// ============================================================================
// SECTION: Construction
// ============================================================================

/// Builds the sink selected by the audit config section.
///
/// # Errors
///
/// Returns an error when the file sink cannot open its log file.
pub fn sink_from_config(config: &AuditConfig) -> io::Result<Arc<dyn ConversionAuditSink>> {
    match (config.sink, config.path.as_deref()) {
        (AuditSinkKind::File, Some(path)) => Ok(Arc::new(FileAuditSink::new(Path::new(path.trim()))?)),
        (AuditSinkKind::File, None) => {
            Err(io::Error::new(io::ErrorKind::InvalidInput, "audit.path is required for the file sink"))
        }
        (AuditSinkKind::Stderr, _) => Ok(Arc::new(StderrAuditSink)),
        (AuditSinkKind::None, _) => Ok(Arc::new(NoopAuditSink)),
    }
}
