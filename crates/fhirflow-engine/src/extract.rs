//! The extraction engine.
//!
//! Precomputes the flat field index for an accepted record: every configured
//! field applicable to the record's resource type is stored under its own
//! name, either with its value or with the explicit absence marker. Fields
//! not configured for the type are omitted entirely.

use fhirflow_config::ExtractionConfig;
use fhirflow_core::{ExtractedIndex, Record};

/// Builds extracted indexes from an extraction configuration.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionEngine<'a> {
    config: &'a ExtractionConfig,
}

impl<'a> ExtractionEngine<'a> {
    pub fn new(config: &'a ExtractionConfig) -> Self {
        Self { config }
    }

    /// Computes the index for one record.
    ///
    /// Field names are looked up as top-level keys, not dotted expressions:
    /// a configured field named `code` indexes the whole `code` subtree.
    pub fn extract(&self, record: &Record) -> ExtractedIndex {
        let resource_type = record.resource_type().unwrap_or_default();

        let mut index = ExtractedIndex::new();
        for field in self.config.applicable_fields(resource_type) {
            match record.get(field) {
                Some(value) => index.insert_present(field, value.clone()),
                None => index.insert_absent(field),
            }
        }
        index
    }
}
