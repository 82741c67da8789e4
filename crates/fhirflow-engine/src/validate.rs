//! The validation engine.
//!
//! Evaluates a record against the rule set resolved for its resource type:
//! wildcard rules merged with type-specific rules, additively. A record with
//! zero issues is accepted; any issue rejects the whole record.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use tracing::debug;

use fhirflow_config::ValidationRuleSet;
use fhirflow_core::Record;

/// A single validation finding.
///
/// Absence and invalid-value are distinct kinds: an enumerated field that is
/// missing from the record is reported as `MissingRequiredField`, never as
/// `InvalidFieldValue`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    MissingRequiredField {
        path: String,
    },
    InvalidFieldValue {
        path: String,
        value: Value,
        allowed: Vec<String>,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRequiredField { path } => {
                write!(f, "missing required field '{path}'")
            }
            Self::InvalidFieldValue { path, value, allowed } => {
                write!(
                    f,
                    "invalid value {value} for field '{path}' (allowed: {})",
                    allowed.join(", ")
                )
            }
        }
    }
}

/// The pass/fail verdict for one record, with its ordered issue list.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ValidationOutcome {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationOutcome {
    /// Empty issue list iff the record passed.
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Human-readable error messages, in issue order.
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

/// Evaluates records against a validation rule set.
#[derive(Debug, Clone, Copy)]
pub struct ValidationEngine<'a> {
    rules: &'a ValidationRuleSet,
}

impl<'a> ValidationEngine<'a> {
    pub fn new(rules: &'a ValidationRuleSet) -> Self {
        Self { rules }
    }

    /// Validates a single record, producing one issue per missing required
    /// path and one per out-of-range enumerated value.
    pub fn validate(&self, record: &Record) -> ValidationOutcome {
        let resource_type = record.resource_type().unwrap_or_default();
        let resolved = self.rules.resolve(resource_type);

        let mut outcome = ValidationOutcome::default();
        let mut missing: Vec<&str> = Vec::new();

        for path in &resolved.required {
            if record.resolve(path).is_none() {
                missing.push(path);
                outcome.issues.push(ValidationIssue::MissingRequiredField {
                    path: path.clone(),
                });
            }
        }

        for (path, allowed) in &resolved.allowed_values {
            match record.resolve(path) {
                Some(value) => {
                    let in_range = value
                        .as_str()
                        .is_some_and(|v| allowed.iter().any(|a| a == v));
                    if !in_range {
                        outcome.issues.push(ValidationIssue::InvalidFieldValue {
                            path: path.clone(),
                            value: value.clone(),
                            allowed: allowed.clone(),
                        });
                    }
                }
                // Absence is a missing-field finding, reported once.
                None => {
                    if !missing.contains(&path.as_str()) {
                        outcome.issues.push(ValidationIssue::MissingRequiredField {
                            path: path.clone(),
                        });
                    }
                }
            }
        }

        if !outcome.is_valid() {
            debug!(
                resource_type,
                id = record.id().unwrap_or("<none>"),
                issues = outcome.issues.len(),
                "record failed validation"
            );
        }

        outcome
    }
}
