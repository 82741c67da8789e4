//! Field extraction configuration.
//!
//! Maps a field name to the resource types it is extracted for: either the
//! keyword `"all"` or an explicit type list. A field absent from the config
//! is never extracted, even when present in the raw record.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::validation::WILDCARD_TYPE;

/// Which resource types a configured field applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FieldScopeRepr", into = "FieldScopeRepr")]
pub enum FieldScope {
    /// Extracted for every resource type.
    All,
    /// Extracted only for the listed resource types.
    Types(Vec<String>),
}

impl FieldScope {
    pub fn applies_to(&self, resource_type: &str) -> bool {
        match self {
            Self::All => true,
            Self::Types(types) => types.iter().any(|t| t == resource_type),
        }
    }
}

/// Wire representation: the string `"all"` or a list of type names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum FieldScopeRepr {
    Keyword(String),
    Types(Vec<String>),
}

impl TryFrom<FieldScopeRepr> for FieldScope {
    type Error = String;

    fn try_from(repr: FieldScopeRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            FieldScopeRepr::Keyword(keyword) if keyword == WILDCARD_TYPE => Ok(Self::All),
            FieldScopeRepr::Keyword(keyword) => {
                Err(format!("unknown scope keyword '{keyword}', expected 'all'"))
            }
            FieldScopeRepr::Types(types) => Ok(Self::Types(types)),
        }
    }
}

impl From<FieldScope> for FieldScopeRepr {
    fn from(scope: FieldScope) -> Self {
        match scope {
            FieldScope::All => Self::Keyword(WILDCARD_TYPE.to_string()),
            FieldScope::Types(types) => Self::Types(types),
        }
    }
}

/// The extraction configuration, keyed by field name in extraction order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractionConfig {
    fields: IndexMap<String, FieldScope>,
}

impl ExtractionConfig {
    pub fn new(fields: IndexMap<String, FieldScope>) -> Self {
        Self { fields }
    }

    /// Parses an extraction config from TOML.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.check()?;
        Ok(config)
    }

    /// Loads an extraction config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(
            path = %path.as_ref().display(),
            fields = config.fields.len(),
            "loaded extraction config"
        );
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        for (field, scope) in &self.fields {
            if let FieldScope::Types(types) = scope
                && types.is_empty()
            {
                return Err(ConfigError::invalid(format!(
                    "empty resource type list for field '{field}'"
                )));
            }
        }
        Ok(())
    }

    /// Whether the field is configured for the given resource type.
    pub fn is_applicable(&self, field: &str, resource_type: &str) -> bool {
        self.fields
            .get(field)
            .is_some_and(|scope| scope.applies_to(resource_type))
    }

    /// Field names configured for the given resource type, in config order.
    pub fn applicable_fields(&self, resource_type: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, scope)| scope.applies_to(resource_type))
            .map(|(field, _)| field.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for ExtractionConfig {
    /// The built-in clinical extraction table.
    fn default() -> Self {
        let clinical = |types: &[&str]| {
            FieldScope::Types(types.iter().map(|t| t.to_string()).collect())
        };

        let mut fields = IndexMap::new();
        fields.insert("id".to_string(), FieldScope::All);
        fields.insert("resourceType".to_string(), FieldScope::All);
        fields.insert("subject".to_string(), FieldScope::All);
        fields.insert("code".to_string(), FieldScope::All);
        fields.insert(
            "status".to_string(),
            clinical(&["Observation", "Procedure", "Condition", "MedicationRequest"]),
        );
        fields.insert("effectiveDateTime".to_string(), clinical(&["Observation"]));
        fields.insert("valueQuantity".to_string(), clinical(&["Observation"]));
        fields.insert("component".to_string(), clinical(&["Observation"]));
        fields.insert("performedDateTime".to_string(), clinical(&["Procedure"]));
        fields.insert("performedPeriod".to_string(), clinical(&["Procedure"]));
        fields.insert("onsetDateTime".to_string(), clinical(&["Condition"]));
        fields.insert("clinicalStatus".to_string(), clinical(&["Condition"]));
        fields.insert(
            "medicationCodeableConcept".to_string(),
            clinical(&["MedicationRequest"]),
        );
        fields.insert(
            "dosageInstruction".to_string(),
            clinical(&["MedicationRequest"]),
        );
        fields.insert("authoredOn".to_string(), clinical(&["MedicationRequest"]));
        Self { fields }
    }
}
