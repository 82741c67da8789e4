//! Per-type validation rule sets.
//!
//! A rule set maps a resource type to its required field paths and optional
//! allowed-value enumerations. The wildcard `"all"` entry applies to every
//! resource type; resolving a type merges wildcard rules first and
//! type-specific rules after, additively — type rules never replace the
//! wildcard ones.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ConfigError, Result};

/// The rule-set key applied to every resource type.
pub const WILDCARD_TYPE: &str = "all";

/// Rules for a single resource type (or the wildcard entry).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypeRules {
    /// Field paths that must resolve on the record.
    #[serde(default)]
    pub required: Vec<String>,
    /// Enumerated valid values keyed by field path, e.g. `status`.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub allowed_values: IndexMap<String, Vec<String>>,
}

impl TypeRules {
    pub fn new(required: Vec<String>) -> Self {
        Self {
            required,
            allowed_values: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_allowed_values(
        mut self,
        field: impl Into<String>,
        values: Vec<String>,
    ) -> Self {
        self.allowed_values.insert(field.into(), values);
        self
    }
}

/// The full validation rule set, keyed by resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationRuleSet {
    rules: IndexMap<String, TypeRules>,
}

/// The merged rules applicable to one resource type: wildcard required
/// fields first, then type-specific ones, deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedRules {
    pub required: Vec<String>,
    pub allowed_values: IndexMap<String, Vec<String>>,
}

impl ValidationRuleSet {
    pub fn new(rules: IndexMap<String, TypeRules>) -> Self {
        Self { rules }
    }

    /// Parses a rule set from TOML.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let rule_set: Self = toml::from_str(content)?;
        rule_set.check()?;
        Ok(rule_set)
    }

    /// Loads a rule set from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let rule_set = Self::from_toml_str(&content)?;
        tracing::info!(
            path = %path.as_ref().display(),
            types = rule_set.rules.len(),
            "loaded validation rule set"
        );
        Ok(rule_set)
    }

    fn check(&self) -> Result<()> {
        for (resource_type, rules) in &self.rules {
            for field in &rules.required {
                if field.is_empty() {
                    return Err(ConfigError::invalid(format!(
                        "empty required field path for type '{resource_type}'"
                    )));
                }
            }
            for (field, values) in &rules.allowed_values {
                if values.is_empty() {
                    return Err(ConfigError::invalid(format!(
                        "empty allowed-value list for '{resource_type}.{field}'"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Rules for a single type entry, without merging.
    pub fn get(&self, resource_type: &str) -> Option<&TypeRules> {
        self.rules.get(resource_type)
    }

    /// Resolves the merged rules for a resource type: wildcard first, then
    /// type-specific, additively. Required paths are deduplicated keeping
    /// their first occurrence; allowed-value enumerations from the type
    /// entry override a wildcard enumeration for the same field.
    pub fn resolve(&self, resource_type: &str) -> ResolvedRules {
        let mut resolved = ResolvedRules::default();

        let layers = [self.rules.get(WILDCARD_TYPE), self.rules.get(resource_type)];
        for rules in layers.into_iter().flatten() {
            for field in &rules.required {
                if !resolved.required.contains(field) {
                    resolved.required.push(field.clone());
                }
            }
            for (field, values) in &rules.allowed_values {
                resolved.allowed_values.insert(field.clone(), values.clone());
            }
        }

        resolved
    }
}

impl Default for ValidationRuleSet {
    /// The built-in clinical rule table.
    fn default() -> Self {
        let mut rules = IndexMap::new();
        rules.insert(
            WILDCARD_TYPE.to_string(),
            TypeRules::new(vec![
                "id".to_string(),
                "resourceType".to_string(),
                "subject".to_string(),
            ]),
        );
        rules.insert(
            "Observation".to_string(),
            TypeRules::new(vec!["code".to_string(), "status".to_string()])
                .with_allowed_values(
                    "status",
                    vec![
                        "final".to_string(),
                        "preliminary".to_string(),
                        "amended".to_string(),
                        "corrected".to_string(),
                    ],
                ),
        );
        rules.insert(
            "MedicationRequest".to_string(),
            TypeRules::new(vec![
                "medicationCodeableConcept".to_string(),
                "status".to_string(),
            ])
            .with_allowed_values(
                "status",
                vec![
                    "completed".to_string(),
                    "active".to_string(),
                    "final".to_string(),
                ],
            ),
        );
        rules.insert(
            "Procedure".to_string(),
            TypeRules::new(vec!["code".to_string(), "status".to_string()])
                .with_allowed_values(
                    "status",
                    vec![
                        "completed".to_string(),
                        "active".to_string(),
                        "final".to_string(),
                    ],
                ),
        );
        rules.insert(
            "Condition".to_string(),
            TypeRules::new(vec!["code".to_string()]),
        );
        Self { rules }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_resolve_merges_wildcard_then_specific() {
        let rule_set = ValidationRuleSet::default();
        let resolved = rule_set.resolve("Observation");

        assert_eq!(
            resolved.required,
            vec!["id", "resourceType", "subject", "code", "status"]
        );
        assert_eq!(
            resolved.allowed_values.get("status").unwrap(),
            &vec!["final", "preliminary", "amended", "corrected"]
        );
    }

    #[test]
    fn test_resolve_unknown_type_uses_wildcard_only() {
        let rule_set = ValidationRuleSet::default();
        let resolved = rule_set.resolve("Encounter");

        assert_eq!(resolved.required, vec!["id", "resourceType", "subject"]);
        assert!(resolved.allowed_values.is_empty());
    }

    #[test]
    fn test_resolve_deduplicates_required_paths() {
        let mut rules = IndexMap::new();
        rules.insert(
            WILDCARD_TYPE.to_string(),
            TypeRules::new(vec!["id".to_string(), "status".to_string()]),
        );
        rules.insert(
            "Procedure".to_string(),
            TypeRules::new(vec!["status".to_string(), "code".to_string()]),
        );
        let rule_set = ValidationRuleSet::new(rules);

        let resolved = rule_set.resolve("Procedure");
        assert_eq!(resolved.required, vec!["id", "status", "code"]);
    }

    #[test]
    fn test_condition_has_no_status_enumeration() {
        let rule_set = ValidationRuleSet::default();
        let resolved = rule_set.resolve("Condition");

        assert_eq!(
            resolved.required,
            vec!["id", "resourceType", "subject", "code"]
        );
        assert!(resolved.allowed_values.is_empty());
    }

    #[test]
    fn test_from_toml_str() {
        let toml = r#"
            [all]
            required = ["id", "resourceType"]

            [Observation]
            required = ["code"]

            [Observation.allowed_values]
            status = ["final", "amended"]
        "#;

        let rule_set = ValidationRuleSet::from_toml_str(toml).unwrap();
        let resolved = rule_set.resolve("Observation");

        assert_eq!(resolved.required, vec!["id", "resourceType", "code"]);
        assert_eq!(
            resolved.allowed_values.get("status").unwrap(),
            &vec!["final", "amended"]
        );
    }

    #[test]
    fn test_empty_allowed_values_rejected() {
        let toml = r#"
            [Observation]
            required = ["code"]

            [Observation.allowed_values]
            status = []
        "#;

        let err = ValidationRuleSet::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "[all]\nrequired = [\"id\"]\n\n[Condition]\nrequired = [\"code\"]\n"
        )
        .unwrap();

        let rule_set = ValidationRuleSet::load(file.path()).unwrap();
        assert_eq!(rule_set.resolve("Condition").required, vec!["id", "code"]);
    }

    #[test]
    fn test_toml_roundtrip() {
        let rule_set = ValidationRuleSet::default();
        let serialized = toml::to_string(&rule_set).unwrap();
        let reparsed = ValidationRuleSet::from_toml_str(&serialized).unwrap();
        assert_eq!(rule_set, reparsed);
    }
}
