//! The transformation pipeline.
//!
//! Applies an ordered sequence of flatten/extract steps to a filtered set of
//! records and returns the reshaped documents without persisting them. A
//! malformed spec aborts the whole request before any record is processed.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use fhirflow_core::{Record, prefix_key, resolve_path, sanitize_path};
use fhirflow_storage::RecordStore;

use crate::error::{EngineError, Result};

/// One transformation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformStep {
    /// Flatten the mapping at `field` into prefixed top-level keys.
    Flatten { field: String },
    /// Extract the value at `field` under a new key (default: the sanitized
    /// field path).
    Extract {
        field: String,
        rename: Option<String>,
    },
}

/// Filter predicates applied before any step. A record failing any predicate
/// is excluded from the transform entirely.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransformFilters {
    /// Resource type membership, when given.
    pub resource_types: Option<Vec<String>>,
    /// Subject reference equality, when given.
    pub subject: Option<String>,
}

impl TransformFilters {
    fn matches(&self, record: &Record) -> bool {
        if let Some(types) = &self.resource_types {
            let resource_type = record.resource_type().unwrap_or_default();
            if !types.iter().any(|t| t == resource_type) {
                return false;
            }
        }
        if let Some(subject) = &self.subject
            && record.subject_reference() != Some(subject.as_str())
        {
            return false;
        }
        true
    }
}

/// An ordered, validated transform request. Ephemeral — constructed per
/// request, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransformSpec {
    pub steps: Vec<TransformStep>,
    pub filters: TransformFilters,
}

#[derive(Debug, Deserialize)]
struct RawSpec {
    #[serde(default, rename = "resourceType")]
    resource_type: Option<Vec<String>>,
    #[serde(default)]
    transformations: Vec<RawStep>,
    #[serde(default)]
    filters: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawStep {
    action: Option<String>,
    field: Option<String>,
    #[serde(rename = "as")]
    rename: Option<String>,
}

impl TransformSpec {
    /// Parses and validates a structured transform request.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::MalformedTransformSpec` for an unknown action
    /// name or a step without a `field` — before any record is processed.
    pub fn from_json(value: &Value) -> Result<Self> {
        let raw: RawSpec = serde_json::from_value(value.clone())
            .map_err(|e| EngineError::malformed_spec(e.to_string()))?;

        let mut steps = Vec::with_capacity(raw.transformations.len());
        for (position, step) in raw.transformations.into_iter().enumerate() {
            let action = step
                .action
                .ok_or_else(|| EngineError::malformed_spec(format!(
                    "step {position} has no action"
                )))?;
            let field = step
                .field
                .ok_or_else(|| EngineError::malformed_spec(format!(
                    "step {position} ({action}) has no field"
                )))?;
            match action.as_str() {
                "flatten" => steps.push(TransformStep::Flatten { field }),
                "extract" => steps.push(TransformStep::Extract {
                    field,
                    rename: step.rename,
                }),
                other => {
                    return Err(EngineError::malformed_spec(format!(
                        "unknown action '{other}' at step {position}"
                    )));
                }
            }
        }

        let mut filters = TransformFilters {
            resource_types: raw.resource_type,
            subject: None,
        };
        for (key, value) in &raw.filters {
            match key.as_str() {
                "subject" => filters.subject = value.as_str().map(str::to_string),
                "resourceType" => {
                    if let Some(resource_type) = value.as_str() {
                        filters
                            .resource_types
                            .get_or_insert_with(Vec::new)
                            .push(resource_type.to_string());
                    }
                }
                other => warn!(filter = other, "ignoring unsupported transform filter"),
            }
        }

        Ok(Self { steps, filters })
    }
}

/// Applies a `TransformSpec` to records, never mutating the input.
#[derive(Debug, Clone, Copy)]
pub struct TransformationPipeline<'a> {
    spec: &'a TransformSpec,
}

impl<'a> TransformationPipeline<'a> {
    pub fn new(spec: &'a TransformSpec) -> Self {
        Self { spec }
    }

    /// Runs the pipeline over a set of records, returning one reshaped
    /// document per record surviving the filters.
    pub fn apply(&self, records: &[Record]) -> Vec<Value> {
        records
            .iter()
            .filter(|record| self.spec.filters.matches(record))
            .map(|record| self.apply_one(record))
            .collect()
    }

    /// Transforms a single record. The output starts as a copy of the
    /// record's top-level object; steps run in declaration order, each
    /// writing into the accumulating output.
    fn apply_one(&self, record: &Record) -> Value {
        let base = match record.as_value().as_object() {
            Some(object) => object.clone(),
            None => Map::new(),
        };
        let mut output = Value::Object(base);

        for step in &self.spec.steps {
            match step {
                TransformStep::Extract { field, rename } => {
                    // extract reads the original record, not the output
                    if let Some(value) = record.resolve(field) {
                        let key = rename
                            .clone()
                            .unwrap_or_else(|| sanitize_path(field));
                        let value = value.clone();
                        if let Some(object) = output.as_object_mut() {
                            object.insert(key, value);
                        }
                    }
                }
                TransformStep::Flatten { field } => {
                    // flatten reads the accumulating output, so keys added
                    // by earlier steps are visible
                    let resolved = resolve_path(&output, field).cloned();
                    if let Some(Value::Object(members)) = resolved {
                        let prefix = prefix_key(field).to_string();
                        if let Some(object) = output.as_object_mut() {
                            for (key, value) in members {
                                object.insert(format!("{prefix}_{key}"), value);
                            }
                        }
                    }
                }
            }
        }

        output
    }
}

/// Runs transform requests over the stored record set.
pub struct TransformService<'a> {
    store: &'a dyn RecordStore,
}

impl<'a> TransformService<'a> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self { store }
    }

    /// Parses the request, loads the stored records and applies the
    /// pipeline. The result is returned directly, never persisted.
    pub fn run(&self, request: &Value) -> Result<Vec<Value>> {
        let spec = TransformSpec::from_json(request)?;

        let records: Vec<Record> = self
            .store
            .all()?
            .into_iter()
            .map(|stored| stored.as_record())
            .collect();

        let transformed = TransformationPipeline::new(&spec).apply(&records);
        debug!(
            input = records.len(),
            output = transformed.len(),
            steps = spec.steps.len(),
            "transform request complete"
        );
        Ok(transformed)
    }
}
