//! The clinical record wrapper.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::resolve_path;

/// A semi-structured clinical record: a tree of nested mappings, sequences
/// and scalars.
///
/// A well-formed record carries the top-level attributes `id`,
/// `resourceType` and `subject`, but none of them is enforced at
/// construction; their absence is surfaced by validation. The record is
/// treated as immutable once accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Value);

impl Record {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Whether the record is a JSON object at the top level.
    pub fn is_object(&self) -> bool {
        self.0.is_object()
    }

    /// Looks up a top-level field by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.as_object()?.get(key)
    }

    /// Resolves a dot-notation path expression against this record.
    pub fn resolve(&self, path: &str) -> Option<&Value> {
        resolve_path(&self.0, path)
    }

    /// The record identifier, if present and a string.
    pub fn id(&self) -> Option<&str> {
        self.get("id")?.as_str()
    }

    /// The resource type discriminator, if present and a string.
    pub fn resource_type(&self) -> Option<&str> {
        self.get("resourceType")?.as_str()
    }

    /// The subject reference string (`subject.reference`), if present.
    pub fn subject_reference(&self) -> Option<&str> {
        self.resolve("subject.reference")?.as_str()
    }

    /// The patient id: the segment after the last `/` of the subject
    /// reference, e.g. `"PT-001"` for `"Patient/PT-001"`.
    pub fn patient_id(&self) -> Option<&str> {
        let reference = self.subject_reference()?;
        reference.rsplit('/').next().filter(|id| !id.is_empty())
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
