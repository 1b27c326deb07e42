//! # Rule Registry
//!
//! The catalogue of rules known to the engine. Rules are loaded once at
//! startup, either from a YAML catalogue file or from the built-in standard
//! catalogue, and only their `is_active` flag changes afterwards.
//!
//! ## Catalogue File Format
//!
//! ```yaml
//! rules:
//!   - id: senator_rule
//!     name: Senators become honorary members
//!     condition: { kind: has_senator_id }
//!     target_category: honorary
//!     priority: 2
//! ```
//!
//! `description` defaults to empty, `is_active` to `true`, and `applies_to`
//! (eligible current categories) to any category.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use memcat_core::{Category, Condition, Rule, RuleId, ValidationError};
use parking_lot::RwLock;
use serde::Deserialize;

/// Registry handle shared between the executor and the API.
pub type SharedRegistry = Arc<RwLock<RuleRegistry>>;

// ---------------------------------------------------------------------------
// RegistryError
// ---------------------------------------------------------------------------

/// Errors raised while loading or mutating the rule catalogue.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Two rules in one catalogue share an id.
    #[error("duplicate rule id: {0}")]
    Duplicate(RuleId),

    /// No rule with the given id.
    #[error("unknown rule: {0}")]
    UnknownRule(String),

    /// A rule failed its own validation.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The catalogue file is not valid YAML or does not match the schema.
    #[error("invalid rule catalogue: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The catalogue file could not be read.
    #[error("cannot read rule catalogue {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Deserialize)]
struct CatalogueFile {
    rules: Vec<Rule>,
}

// ---------------------------------------------------------------------------
// RuleRegistry
// ---------------------------------------------------------------------------

/// Validated rule catalogue keyed by rule id.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: BTreeMap<RuleId, Rule>,
}

impl RuleRegistry {
    /// Build a registry from a list of rules.
    ///
    /// # Errors
    ///
    /// Fails on the first invalid rule or duplicate id.
    pub fn new(rules: impl IntoIterator<Item = Rule>) -> Result<Self, RegistryError> {
        let mut map = BTreeMap::new();
        for rule in rules {
            rule.validate()?;
            if map.contains_key(&rule.id) {
                return Err(RegistryError::Duplicate(rule.id));
            }
            map.insert(rule.id.clone(), rule);
        }
        Ok(Self { rules: map })
    }

    /// The built-in catalogue used when no catalogue file is configured.
    pub fn standard() -> Self {
        let rules = standard_rules()
            .into_iter()
            .map(|rule| (rule.id.clone(), rule))
            .collect();
        Self { rules }
    }

    /// Parse a YAML catalogue.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, RegistryError> {
        let file: CatalogueFile = serde_yaml::from_str(yaml)?;
        Self::new(file.rules)
    }

    /// Read and parse a YAML catalogue file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Wrap the registry for sharing.
    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }

    /// Look up a rule by id.
    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.get(id)
    }

    /// Look up a rule by id, failing with [`RegistryError::UnknownRule`].
    pub fn require(&self, id: &str) -> Result<&Rule, RegistryError> {
        self.get(id)
            .ok_or_else(|| RegistryError::UnknownRule(id.to_string()))
    }

    /// All rules in evaluation order (ascending priority, ties by id).
    pub fn list(&self) -> Vec<Rule> {
        let mut rules: Vec<Rule> = self.rules.values().cloned().collect();
        sort_by_priority(&mut rules);
        rules
    }

    /// Active rules in evaluation order.
    pub fn active_in_priority_order(&self) -> Vec<Rule> {
        let mut rules: Vec<Rule> = self
            .rules
            .values()
            .filter(|r| r.is_active)
            .cloned()
            .collect();
        sort_by_priority(&mut rules);
        rules
    }

    pub fn total(&self) -> usize {
        self.rules.len()
    }

    pub fn active_count(&self) -> usize {
        self.rules.values().filter(|r| r.is_active).count()
    }

    /// Flip a rule's active flag, returning the updated rule.
    pub fn set_active(&mut self, id: &str, is_active: bool) -> Result<Rule, RegistryError> {
        let rule = self
            .rules
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownRule(id.to_string()))?;
        rule.is_active = is_active;
        tracing::info!(rule_id = %rule.id, is_active, "rule activation changed");
        Ok(rule.clone())
    }
}

/// Sort rules into evaluation order: ascending priority, ties by id.
pub fn sort_by_priority(rules: &mut [Rule]) {
    rules.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
}

// ---------------------------------------------------------------------------
// Standard catalogue
// ---------------------------------------------------------------------------

fn standard_rule(
    id: &str,
    name: &str,
    description: &str,
    condition: Condition,
    target: &str,
    priority: i32,
    applies_to: &[&str],
) -> Option<Rule> {
    let id = RuleId::new(id).ok()?;
    let target = Category::new(target).ok()?;
    let applies_to = applies_to
        .iter()
        .map(|c| Category::new(*c).ok())
        .collect::<Option<Vec<_>>>()?;
    Some(
        Rule::new(id, name, condition, target, priority)
            .with_description(description)
            .with_applies_to(applies_to),
    )
}

/// The standard rules shipped with the engine.
pub fn standard_rules() -> Vec<Rule> {
    [
        standard_rule(
            "senator_rule",
            "Senators become honorary members",
            "Members holding a senate identifier are moved to the honorary category.",
            Condition::HasSenatorId,
            "honorary",
            2,
            &[],
        ),
        standard_rule(
            "age_rule",
            "Members aged 40 and over become affiliates",
            "Active members whose age in completed years is at least 40 are moved to the affiliate category.",
            Condition::AgeAtLeast { years: 40 },
            "affiliate",
            3,
            &["active"],
        ),
        standard_rule(
            "new_registration_rule",
            "New registrations are provisional",
            "Active members registered within the last 30 days are moved to the provisional category.",
            Condition::IsNewRegistration { within_days: 30 },
            "provisional",
            4,
            &["active"],
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}
