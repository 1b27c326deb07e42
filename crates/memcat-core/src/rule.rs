//! # Rule Definitions
//!
//! A rule is an immutable catalogue entry mapping one condition to a target
//! category. Rules are deployment configuration: they are loaded once and
//! only their `is_active` flag changes at runtime.
//!
//! ## Condition Catalogue
//!
//! The set of condition kinds is closed. Adding a kind means adding a
//! variant to [`Condition`], which forces every `match` over it (the
//! evaluator first among them) to handle the new kind.
//!
//! ## Eligibility
//!
//! `applies_to` restricts a rule to members whose *current* category is in
//! the list (empty means any category). Within one pass rules see the
//! categories written by earlier rules, so this is what lets a
//! higher-priority rule take a member out of reach of a lower-priority one.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::category::Category;
use crate::error::ValidationError;
use crate::identity::RuleId;

/// Version of the built-in condition catalogue. Bumped whenever a kind is
/// added or the semantics of an existing kind change.
pub const CONDITION_CATALOGUE_VERSION: u32 = 1;

/// Upper bound for age thresholds.
pub const MAX_AGE_THRESHOLD: u32 = 150;

/// The condition a rule tests against a member snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// Member carries a non-blank senator identifier.
    HasSenatorId,
    /// Member's age in completed years is at least `years`.
    AgeAtLeast { years: u32 },
    /// Member's age in completed years is below `years`.
    AgeBelow { years: u32 },
    /// Member registered within the trailing `within_days` days.
    IsNewRegistration { within_days: u32 },
}

impl Condition {
    /// Stable tag of the condition kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::HasSenatorId => "has_senator_id",
            Self::AgeAtLeast { .. } => "age_at_least",
            Self::AgeBelow { .. } => "age_below",
            Self::IsNewRegistration { .. } => "is_new_registration",
        }
    }

    fn validate(&self) -> Result<(), String> {
        match *self {
            Self::HasSenatorId => Ok(()),
            Self::AgeAtLeast { years } | Self::AgeBelow { years } => {
                if years == 0 || years > MAX_AGE_THRESHOLD {
                    Err(format!(
                        "{} threshold must be within 1..={MAX_AGE_THRESHOLD}, got {years}",
                        self.kind()
                    ))
                } else {
                    Ok(())
                }
            }
            Self::IsNewRegistration { within_days } => {
                if within_days == 0 {
                    Err("is_new_registration window must be at least one day".to_string())
                } else {
                    Ok(())
                }
            }
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HasSenatorId => f.write_str("has senator id"),
            Self::AgeAtLeast { years } => write!(f, "age ≥ {years}"),
            Self::AgeBelow { years } => write!(f, "age < {years}"),
            Self::IsNewRegistration { within_days } => {
                write!(f, "registered within {within_days} days")
            }
        }
    }
}

fn default_active() -> bool {
    true
}

/// A catalogue entry: condition → target category, with an evaluation
/// priority (lower runs first) and an active flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Rule {
    pub id: RuleId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub condition: Condition,
    pub target_category: Category,
    pub priority: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Current categories the rule may move members out of. Empty = any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applies_to: Vec<Category>,
}

impl Rule {
    /// Create an active rule with an empty description.
    pub fn new(
        id: RuleId,
        name: impl Into<String>,
        condition: Condition,
        target_category: Category,
        priority: i32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            condition,
            target_category,
            priority,
            is_active: true,
            applies_to: Vec::new(),
        }
    }

    /// Builder: set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: set the active flag.
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Builder: restrict the rule to members currently in one of `categories`.
    pub fn with_applies_to(mut self, categories: impl IntoIterator<Item = Category>) -> Self {
        self.applies_to = categories.into_iter().collect();
        self
    }

    /// Whether a member currently in `category` is eligible for this rule.
    pub fn is_eligible(&self, category: &Category) -> bool {
        self.applies_to.is_empty() || self.applies_to.contains(category)
    }

    /// Check the rule's own invariants (name present, condition parameters
    /// in range). Catalogue-level checks such as id uniqueness live with
    /// the registry.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidRule`] describing the first problem.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::InvalidRule {
                rule_id: self.id.to_string(),
                reason: "name must not be empty".to_string(),
            });
        }
        self.condition
            .validate()
            .map_err(|reason| ValidationError::InvalidRule {
                rule_id: self.id.to_string(),
                reason,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(condition: Condition) -> Rule {
        Rule::new(
            RuleId::new("r").unwrap(),
            "Test rule",
            condition,
            Category::new("affiliate").unwrap(),
            1,
        )
    }

    #[test]
    fn condition_serde_uses_kind_tag() {
        let json = serde_json::to_value(Condition::AgeAtLeast { years: 40 }).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "age_at_least", "years": 40}));

        let parsed: Condition =
            serde_json::from_value(serde_json::json!({"kind": "has_senator_id"})).unwrap();
        assert_eq!(parsed, Condition::HasSenatorId);
    }

    #[test]
    fn unknown_condition_kind_is_rejected() {
        let result: Result<Condition, _> =
            serde_json::from_value(serde_json::json!({"kind": "custom_script"}));
        assert!(result.is_err());
    }

    #[test]
    fn kind_matches_serde_tag() {
        for condition in [
            Condition::HasSenatorId,
            Condition::AgeAtLeast { years: 1 },
            Condition::AgeBelow { years: 1 },
            Condition::IsNewRegistration { within_days: 1 },
        ] {
            let json = serde_json::to_value(condition).unwrap();
            assert_eq!(json["kind"], condition.kind());
        }
    }

    #[test]
    fn validate_thresholds() {
        assert!(rule(Condition::AgeAtLeast { years: 40 }).validate().is_ok());
        assert!(rule(Condition::AgeAtLeast { years: 0 }).validate().is_err());
        assert!(rule(Condition::AgeBelow { years: 151 }).validate().is_err());
        assert!(rule(Condition::IsNewRegistration { within_days: 0 })
            .validate()
            .is_err());
    }

    #[test]
    fn validate_rejects_blank_name() {
        let mut r = rule(Condition::HasSenatorId);
        r.name = "  ".into();
        let err = r.validate().unwrap_err();
        assert!(err.to_string().contains("name must not be empty"));
    }

    #[test]
    fn is_active_defaults_to_true() {
        let parsed: Rule = serde_json::from_value(serde_json::json!({
            "id": "senator_rule",
            "name": "Senators",
            "condition": {"kind": "has_senator_id"},
            "target_category": "honorary",
            "priority": 2,
        }))
        .unwrap();
        assert!(parsed.is_active);
        assert!(parsed.description.is_empty());
        assert!(parsed.applies_to.is_empty());
    }

    #[test]
    fn eligibility_filters_on_current_category() {
        let active = Category::new("active").unwrap();
        let honorary = Category::new("honorary").unwrap();

        let open = rule(Condition::HasSenatorId);
        assert!(open.is_eligible(&honorary));

        let guarded = open.with_applies_to([active.clone()]);
        assert!(guarded.is_eligible(&active));
        assert!(!guarded.is_eligible(&honorary));
    }
}
