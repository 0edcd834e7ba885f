// crates/policy-api/src/validation/field.rs
// ============================================================================
// Module: Field Paths and Findings
// Description: Dot/index field paths and validation findings.
// Purpose: Report every problem against the exact field that caused it.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Validation never stops at the first problem. Each check appends a
//! [`FieldError`] naming the offending field (for example
//! `spec.rules[1].name`) and a message, and callers receive the full list.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use serde::Serializer;

// ============================================================================
// SECTION: Field Path
// ============================================================================

/// One step of a field path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    /// Named field.
    Field(String),
    /// List position.
    Index(usize),
}

/// Path from the object root to a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath {
    /// Path steps from the root.
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Starts a path at a named root field.
    #[must_use]
    pub fn new(root: &str) -> Self {
        Self {
            segments: vec![PathSegment::Field(root.to_string())],
        }
    }

    /// Returns the path extended by a named field.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Field(name.to_string()));
        Self {
            segments,
        }
    }

    /// Returns the path extended by a list index.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Index(index));
        Self {
            segments,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if position == 0 => f.write_str(name)?,
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl Serialize for FieldPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

// ============================================================================
// SECTION: Findings
// ============================================================================

/// Category of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    /// The value is not acceptable.
    Invalid,
    /// A required value is missing.
    Required,
    /// The value repeats an earlier one.
    Duplicate,
    /// The field may not be set in this context.
    Forbidden,
    /// The value is outside the supported set.
    NotSupported,
}

impl FieldErrorKind {
    /// Returns the human-readable label used in messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Invalid => "Invalid value",
            Self::Required => "Required value",
            Self::Duplicate => "Duplicate value",
            Self::Forbidden => "Forbidden",
            Self::NotSupported => "Unsupported value",
        }
    }
}

/// Validation finding: a field path plus a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Path of the offending field.
    pub path: FieldPath,
    /// Finding category.
    pub kind: FieldErrorKind,
    /// Human-readable message.
    pub message: String,
}

impl FieldError {
    /// Builds a finding.
    #[must_use]
    pub fn new(path: FieldPath, kind: FieldErrorKind, message: impl Into<String>) -> Self {
        Self {
            path,
            kind,
            message: message.into(),
        }
    }

    /// Builds an [`FieldErrorKind::Invalid`] finding.
    #[must_use]
    pub fn invalid(path: FieldPath, message: impl Into<String>) -> Self {
        Self::new(path, FieldErrorKind::Invalid, message)
    }

    /// Builds a [`FieldErrorKind::Required`] finding.
    #[must_use]
    pub fn required(path: FieldPath, message: impl Into<String>) -> Self {
        Self::new(path, FieldErrorKind::Required, message)
    }

    /// Builds a [`FieldErrorKind::Duplicate`] finding.
    #[must_use]
    pub fn duplicate(path: FieldPath, message: impl Into<String>) -> Self {
        Self::new(path, FieldErrorKind::Duplicate, message)
    }

    /// Builds a [`FieldErrorKind::Forbidden`] finding.
    #[must_use]
    pub fn forbidden(path: FieldPath, message: impl Into<String>) -> Self {
        Self::new(path, FieldErrorKind::Forbidden, message)
    }

    /// Builds a [`FieldErrorKind::NotSupported`] finding.
    #[must_use]
    pub fn not_supported(path: FieldPath, message: impl Into<String>) -> Self {
        Self::new(path, FieldErrorKind::NotSupported, message)
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.path, self.kind.label(), self.message)
    }
}

/// Ordered list of findings; empty means valid.
pub type FieldErrorList = Vec<FieldError>;
