//! Stored record types shared by all storage backends.

use fhirflow_core::{ExtractedIndex, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// An accepted record as held by a storage backend, together with its
/// precomputed extracted index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// The record identifier (unique across the store).
    pub id: String,
    /// The resource type discriminator.
    #[serde(rename = "resourceType")]
    pub resource_type: String,
    /// The subject reference string, when the record carries one.
    #[serde(rename = "subjectReference", skip_serializing_if = "Option::is_none")]
    pub subject_reference: Option<String>,
    /// The full raw record content.
    pub record: Value,
    /// The flat field index computed at import time.
    pub extracted: ExtractedIndex,
    /// When the record was imported.
    #[serde(rename = "importedAt", with = "time::serde::rfc3339")]
    pub imported_at: OffsetDateTime,
}

impl StoredRecord {
    /// Builds a `StoredRecord` from an accepted record and its index,
    /// stamping the import time.
    pub fn new(record: &Record, extracted: ExtractedIndex, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_type: record.resource_type().unwrap_or_default().to_string(),
            subject_reference: record.subject_reference().map(str::to_string),
            record: record.as_value().clone(),
            extracted,
            imported_at: OffsetDateTime::now_utc(),
        }
    }

    /// The stored content as a `Record` view.
    pub fn as_record(&self) -> Record {
        Record::new(self.record.clone())
    }

    /// Whether this record's subject matches a filter value: a value
    /// containing `/` is compared against the full reference, a bare id is
    /// matched as a `/id` suffix.
    pub fn subject_matches(&self, subject: &str) -> bool {
        match &self.subject_reference {
            Some(reference) if subject.contains('/') => reference == subject,
            Some(reference) => {
                reference == subject || reference.ends_with(&format!("/{subject}"))
            }
            None => false,
        }
    }
}
