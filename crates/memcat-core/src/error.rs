//! # Error Hierarchy
//!
//! Validation errors for the domain primitives, built with `thiserror`.
//! No `.unwrap()` outside tests.
//!
//! Evaluation problems (a missing birth date, an unparseable timestamp) are
//! deliberately absent here: the evaluator treats them as non-matches.

use thiserror::Error;

/// Domain primitive validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Category names must contain at least one non-whitespace character.
    #[error("category must not be empty")]
    EmptyCategory,

    /// Category name exceeds the maximum length.
    #[error("category '{value}' exceeds {max} characters")]
    CategoryTooLong {
        /// The offending value.
        value: String,
        /// The maximum permitted length.
        max: usize,
    },

    /// Identifier was empty after trimming.
    #[error("{kind} identifier must not be empty")]
    EmptyIdentifier {
        /// Which identifier ("member", "rule").
        kind: &'static str,
    },

    /// A rule definition failed validation.
    #[error("rule '{rule_id}' is invalid: {reason}")]
    InvalidRule {
        /// The rule being validated.
        rule_id: String,
        /// Why the rule was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_carry_context() {
        let err = ValidationError::CategoryTooLong {
            value: "x".repeat(3),
            max: 2,
        };
        assert!(err.to_string().contains("exceeds 2"));

        let err = ValidationError::EmptyIdentifier { kind: "rule" };
        assert_eq!(err.to_string(), "rule identifier must not be empty");

        let err = ValidationError::InvalidRule {
            rule_id: "age_rule".into(),
            reason: "threshold out of range".into(),
        };
        assert!(err.to_string().contains("age_rule"));
        assert!(err.to_string().contains("threshold out of range"));
    }
}
