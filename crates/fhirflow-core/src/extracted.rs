//! The precomputed flat field index owned by an accepted record.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A value in an extracted index: either the resolved value or an explicit
/// absence marker.
///
/// Absence is distinct from omission — a field configured for the record's
/// resource type but missing from the record is stored as `Absent`, while a
/// field not configured for the type never appears in the index at all.
/// `Absent` serializes as JSON `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractedValue {
    Absent,
    Present(Value),
}

impl ExtractedValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// The contained value, if present.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Present(value) => Some(value),
            Self::Absent => None,
        }
    }
}

/// The flat mapping from configured field name to extracted value, computed
/// once per accepted record and recomputed only on re-import.
///
/// Iteration order is insertion order, so an index built from an extraction
/// config enumerates fields in configuration order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedIndex {
    fields: IndexMap<String, ExtractedValue>,
}

impl ExtractedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_present(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), ExtractedValue::Present(value));
    }

    pub fn insert_absent(&mut self, field: impl Into<String>) {
        self.fields.insert(field.into(), ExtractedValue::Absent);
    }

    pub fn get(&self, field: &str) -> Option<&ExtractedValue> {
        self.fields.get(field)
    }

    /// Whether the field appears in the index at all (present or absent).
    pub fn contains_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ExtractedValue)> {
        self.fields.iter()
    }

    /// Field names stored with the absence marker.
    pub fn absent_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, value)| value.is_absent())
            .map(|(field, _)| field.as_str())
    }

    /// A flat JSON document of the present entries, suitable for projection.
    pub fn to_document(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .filter_map(|(field, value)| {
                value.value().map(|v| (field.clone(), v.clone()))
            })
            .collect()
    }
}
