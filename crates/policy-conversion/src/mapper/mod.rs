// crates/policy-conversion/src/mapper/mod.rs
// ============================================================================
// Module: Field Mapper
// Description: Per-field bidirectional mapping between hub and spoke.
// Purpose: Group the directional mappers, condition parsing, and the table.
// Dependencies: policy-api
// ============================================================================

//! ## Overview
//! [`down`] maps hub composites to spoke composites and [`up`] maps them
//! back. Both are plain structural copies; there is no aliasing between the
//! source and the destination. Mapping fails only when a nested raw
//! condition block is malformed.

pub mod conditions;
pub mod down;
pub mod table;
pub mod up;

pub use table::FIELD_MAPPINGS;
pub use table::FieldClass;
pub use table::FieldMapping;
pub use table::MANUAL_CONVERSION_NOTE;
pub use table::field_mappings;
pub use table::manual_conversion_fields;
