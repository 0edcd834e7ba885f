// crates/policy-api/src/schema/routing.rs
// ============================================================================
// Module: Rule Kind Routing
// Description: Rule kind derivation and the policy-level routed field bundle.
// Purpose: Decide which spoke rule field carries each hub policy-level value.
// Dependencies: crate::schema
// ============================================================================

//! ## Overview
//! The hub keeps the failure action and background triggers once per policy;
//! the spoke keeps them per rule. [`RuleKind`] is derived once per rule and
//! decides which per-rule field a policy-level value lands in. Walking rules
//! in order, the last rule of a kind supplies the policy-level value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::schema::common::ValidationFailureAction;
use crate::schema::hub;
use crate::schema::spoke;

// ============================================================================
// SECTION: Rule Kind
// ============================================================================

/// Primary kind of a rule, by priority validate > mutate > generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Rule has a validation block.
    Validate,
    /// Rule has a mutation block and no validation block.
    Mutate,
    /// Rule has only a generation block among the three.
    Generate,
    /// Rule only verifies images.
    VerifyImages,
    /// Rule defines no action.
    Empty,
}

impl RuleKind {
    /// Derives the kind from which action blocks are present.
    #[must_use]
    pub const fn from_blocks(
        validate: bool,
        mutate: bool,
        generate: bool,
        verify_images: bool,
    ) -> Self {
        if validate {
            Self::Validate
        } else if mutate {
            Self::Mutate
        } else if generate {
            Self::Generate
        } else if verify_images {
            Self::VerifyImages
        } else {
            Self::Empty
        }
    }

    /// Derives the kind of a hub rule.
    #[must_use]
    pub fn of_hub(rule: &hub::Rule) -> Self {
        Self::from_blocks(
            rule.validation.is_some(),
            rule.mutation.is_some(),
            rule.generation.is_some(),
            !rule.verify_images.is_empty(),
        )
    }

    /// Derives the kind of a spoke rule.
    #[must_use]
    pub fn of_spoke(rule: &spoke::Rule) -> Self {
        Self::from_blocks(
            rule.validation.is_some(),
            rule.mutation.is_some(),
            rule.generation.is_some(),
            !rule.verify_images.is_empty(),
        )
    }

    /// Returns a lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Mutate => "mutate",
            Self::Generate => "generate",
            Self::VerifyImages => "verifyImages",
            Self::Empty => "empty",
        }
    }
}

// ============================================================================
// SECTION: Routed Fields
// ============================================================================

/// Policy-level hub values that the spoke stores per rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoutedFields {
    /// Validation failure action, carried by validate rules.
    pub validation_failure_action: Option<ValidationFailureAction>,
    /// Mutate-existing trigger, carried by mutate rules.
    pub mutate_existing_on_policy_update: bool,
    /// Generate-existing trigger, carried by generate rules.
    pub generate_existing: bool,
}

impl RoutedFields {
    /// Reads the policy-level values from a hub spec.
    #[must_use]
    pub const fn from_hub(spec: &hub::Spec) -> Self {
        Self {
            validation_failure_action: spec.validation_failure_action,
            mutate_existing_on_policy_update: spec.mutate_existing_on_policy_update,
            generate_existing: spec.generate_existing,
        }
    }

    /// Aggregates per-rule values of a spoke spec; the last rule of each kind wins.
    #[must_use]
    pub fn from_spoke(spec: &spoke::Spec) -> Self {
        Self::from_spoke_rules(&spec.rules)
    }

    /// Aggregates per-rule values of spoke rules in order.
    #[must_use]
    pub fn from_spoke_rules(rules: &[spoke::Rule]) -> Self {
        let mut routed = Self::default();
        for rule in rules {
            match RuleKind::of_spoke(rule) {
                RuleKind::Validate => {
                    if let Some(validation) = &rule.validation {
                        routed.validation_failure_action = validation.validation_failure_action;
                    }
                }
                RuleKind::Mutate => {
                    if let Some(mutation) = &rule.mutation {
                        routed.mutate_existing_on_policy_update =
                            mutation.mutate_existing_on_policy_update;
                    }
                }
                RuleKind::Generate => {
                    if let Some(generation) = &rule.generation {
                        routed.generate_existing = generation.generate_existing;
                    }
                }
                RuleKind::VerifyImages | RuleKind::Empty => {}
            }
        }
        routed
    }

    /// Writes the values into the hub spec's policy-level fields.
    pub const fn write_hub(self, spec: &mut hub::Spec) {
        spec.validation_failure_action = self.validation_failure_action;
        spec.mutate_existing_on_policy_update = self.mutate_existing_on_policy_update;
        spec.generate_existing = self.generate_existing;
    }

    /// Writes the value matching the rule's kind into a spoke rule.
    pub fn route_into(self, rule: &mut spoke::Rule) {
        match RuleKind::of_spoke(rule) {
            RuleKind::Validate => {
                if let Some(validation) = rule.validation.as_mut() {
                    validation.validation_failure_action = self.validation_failure_action;
                }
            }
            RuleKind::Mutate => {
                if let Some(mutation) = rule.mutation.as_mut() {
                    mutation.mutate_existing_on_policy_update =
                        self.mutate_existing_on_policy_update;
                }
            }
            RuleKind::Generate => {
                if let Some(generation) = rule.generation.as_mut() {
                    generation.generate_existing = self.generate_existing;
                }
            }
            RuleKind::VerifyImages | RuleKind::Empty => {}
        }
    }

    /// Failure action a spoke rule is evaluated with.
    ///
    /// A rule with its own validate block uses its own action; any other rule
    /// inherits the value the hub would hold for the whole policy.
    #[must_use]
    pub fn effective_failure_action(
        spec: &spoke::Spec,
        rule: &spoke::Rule,
    ) -> Option<ValidationFailureAction> {
        match &rule.validation {
            Some(validation) => validation.validation_failure_action,
            None => Self::from_spoke(spec).validation_failure_action,
        }
    }
}
