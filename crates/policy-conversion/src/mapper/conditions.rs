// crates/policy-conversion/src/mapper/conditions.rs
// ============================================================================
// Module: Condition Mapping
// Description: Raw hub condition blocks to typed any/all blocks and back.
// Purpose: Parse the loosely shaped hub conditions without guessing.
// Dependencies: policy-api, serde_json
// ============================================================================

//! ## Overview
//! The hub stores `preconditions` and `deny.conditions` as raw JSON. Two
//! shapes are accepted: an `{any, all}` object, or a bare list that means
//! `any`. `null` is an empty block. Every other shape is a terminal
//! [`ConversionError::MalformedConditions`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use policy_api::AnyAllConditions;
use policy_api::Condition;
use policy_api::FieldPath;
use serde_json::Value;

use crate::error::ConversionError;

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses a raw hub condition block.
///
/// # Errors
///
/// Returns [`ConversionError::MalformedConditions`] when the value is a
/// scalar or does not decode as conditions.
pub fn parse_conditions(raw: &Value, path: &FieldPath) -> Result<AnyAllConditions, ConversionError> {
    match raw {
        Value::Null => Ok(AnyAllConditions::default()),
        Value::Object(_) => serde_json::from_value(raw.clone())
            .map_err(|err| malformed(path, err.to_string())),
        Value::Array(_) => {
            let any: Vec<Condition> = serde_json::from_value(raw.clone())
                .map_err(|err| malformed(path, err.to_string()))?;
            Ok(AnyAllConditions {
                any,
                all: Vec::new(),
            })
        }
        Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            Err(malformed(path, "expected an any/all object or a list of conditions".to_string()))
        }
    }
}

/// Parses an optional raw block, keeping absence as absence.
///
/// # Errors
///
/// Returns [`ConversionError::MalformedConditions`] as [`parse_conditions`].
pub fn parse_optional(
    raw: Option<&Value>,
    path: &FieldPath,
) -> Result<Option<AnyAllConditions>, ConversionError> {
    raw.map(|value| parse_conditions(value, path)).transpose()
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders a typed block as the raw `{any, all}` object the hub stores.
///
/// # Errors
///
/// Returns [`ConversionError::Encode`] when serialization fails.
pub fn render_conditions(conditions: &AnyAllConditions) -> Result<Value, ConversionError> {
    serde_json::to_value(conditions).map_err(|err| ConversionError::Encode(err.to_string()))
}

/// Renders an optional typed block.
///
/// # Errors
///
/// Returns [`ConversionError::Encode`] when serialization fails.
pub fn render_optional(conditions: Option<&AnyAllConditions>) -> Result<Option<Value>, ConversionError> {
    conditions.map(render_conditions).transpose()
}

/// Builds the malformed-conditions error for a path.
fn malformed(path: &FieldPath, message: String) -> ConversionError {
    ConversionError::MalformedConditions {
        path: path.clone(),
        message,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use serde_json::json;

    use super::*;

    fn path() -> FieldPath {
        FieldPath::new("spec").child("rules").index(0).child("preconditions")
    }

    #[test]
    fn bare_list_becomes_any() {
        let raw = json!([{"key": "{{ request.operation }}", "operator": "Equals", "value": "CREATE"}]);
        let parsed = parse_conditions(&raw, &path()).unwrap();
        assert_eq!(parsed.any.len(), 1);
        assert!(parsed.all.is_empty());
        assert_eq!(parsed.any[0].operator, "Equals");
    }

    #[test]
    fn object_keeps_both_lists() {
        let raw = json!({
            "any": [{"key": "a", "operator": "Equals", "value": 1}],
            "all": [{"key": "b", "operator": "NotEquals", "value": 2}]
        });
        let parsed = parse_conditions(&raw, &path()).unwrap();
        assert_eq!(parsed.any.len(), 1);
        assert_eq!(parsed.all.len(), 1);
    }

    #[test]
    fn null_is_empty_block() {
        assert_eq!(parse_conditions(&Value::Null, &path()).unwrap(), AnyAllConditions::default());
    }

    #[test]
    fn scalar_is_terminal_error() {
        let error = parse_conditions(&json!("always"), &path()).unwrap_err();
        assert_eq!(error.kind(), "malformed_conditions");
        assert!(error.to_string().contains("spec.rules[0].preconditions"));
    }

    #[test]
    fn list_of_scalars_is_terminal_error() {
        assert!(parse_conditions(&json!([1, 2]), &path()).is_err());
    }

    #[test]
    fn rendering_produces_object_form() {
        let parsed = parse_conditions(&json!([{"key": "a", "operator": "In", "value": ["x"]}]), &path())
            .unwrap();
        let rendered = render_conditions(&parsed).unwrap();
        assert_eq!(rendered, json!({"any": [{"key": "a", "operator": "In", "value": ["x"]}]}));
        assert_eq!(parse_conditions(&rendered, &path()).unwrap(), parsed);
    }
}
