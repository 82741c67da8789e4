//! Query projection over stored records.
//!
//! List requests filter by resource type and subject and project requested
//! fields path-by-path over each record's extracted index; get-by-id
//! projects over the full raw record. Projection never re-parses the
//! document — each requested path either resolves or is left out.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use fhirflow_core::resolve_path;
use fhirflow_storage::{RecordStore, StoredRecord};

use crate::error::{EngineError, Result};

/// Parameters for a list request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    /// Filter to one resource type.
    #[serde(rename = "resourceType")]
    pub resource_type: Option<String>,
    /// Filter by subject: either a full reference (`Patient/PT-001`,
    /// matched exactly) or a bare id (matched as a `/id` suffix).
    pub subject: Option<String>,
    /// Path expressions to project; `None` returns the whole source
    /// document.
    pub fields: Option<Vec<String>>,
}

/// Splits a comma-separated `fields` parameter into path expressions,
/// dropping empty entries.
pub fn parse_fields(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(str::to_string)
        .collect()
}

/// Projects the requested fields out of a source document.
///
/// Each field is resolved as a path expression and stored under the field
/// string itself; when path resolution misses but the field exists verbatim
/// as a top-level key, the top-level value is used. Fields that resolve
/// nowhere are omitted — no null placeholders.
pub fn project_fields(source: &Value, fields: &[String]) -> Map<String, Value> {
    let mut projected = Map::new();
    for field in fields {
        if let Some(value) = resolve_path(source, field) {
            projected.insert(field.clone(), value.clone());
        } else if let Some(value) = source.as_object().and_then(|o| o.get(field.as_str())) {
            projected.insert(field.clone(), value.clone());
        }
    }
    projected
}

/// Read-side service over a record store.
pub struct QueryService<'a> {
    store: &'a dyn RecordStore,
}

impl<'a> QueryService<'a> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self { store }
    }

    fn matches(stored: &StoredRecord, params: &ListParams) -> bool {
        if let Some(resource_type) = &params.resource_type
            && &stored.resource_type != resource_type
        {
            return false;
        }
        if let Some(subject) = &params.subject
            && !stored.subject_matches(subject)
        {
            return false;
        }
        true
    }

    /// Lists matching records as flat documents built from their extracted
    /// indexes, one per record, in storage order.
    pub fn list(&self, params: &ListParams) -> Result<Vec<Map<String, Value>>> {
        let stored = self.store.all()?;
        let matched = stored
            .iter()
            .filter(|record| Self::matches(record, params));

        let documents: Vec<Map<String, Value>> = match &params.fields {
            Some(fields) => matched
                .map(|record| {
                    let source = Value::Object(record.extracted.to_document());
                    project_fields(&source, fields)
                })
                .collect(),
            None => matched
                .map(|record| record.extracted.to_document())
                .collect(),
        };

        debug!(results = documents.len(), "list query complete");
        Ok(documents)
    }

    /// Fetches a single record by id, projected over its raw content.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::RecordNotFound` when the id is absent.
    pub fn get_by_id(&self, id: &str, fields: Option<&[String]>) -> Result<Map<String, Value>> {
        let stored = self
            .store
            .get(id)?
            .ok_or_else(|| EngineError::record_not_found(id))?;

        let mut document = match fields {
            Some(fields) => project_fields(&stored.record, fields),
            None => stored
                .record
                .as_object()
                .cloned()
                .unwrap_or_default(),
        };

        // the identifier is always part of the response
        document
            .entry("id".to_string())
            .or_insert_with(|| Value::String(stored.id.clone()));

        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhirflow_config::ExtractionConfig;
    use fhirflow_core::Record;
    use fhirflow_storage::MemoryStore;
    use serde_json::json;

    use crate::extract::ExtractionEngine;

    fn store_fixture() -> MemoryStore {
        let config = ExtractionConfig::default();
        let extractor = ExtractionEngine::new(&config);
        let store = MemoryStore::new();

        let records = [
            json!({
                "id": "obs-1",
                "resourceType": "Observation",
                "subject": {"reference": "Patient/PT-1"},
                "code": {"text": "BP", "coding": [{"code": "85354-9"}]},
                "status": "final"
            }),
            json!({
                "id": "obs-2",
                "resourceType": "Observation",
                "subject": {"reference": "Patient/PT-2"},
                "code": {"text": "HR"},
                "status": "preliminary"
            }),
            json!({
                "id": "cond-1",
                "resourceType": "Condition",
                "subject": {"reference": "Patient/PT-1"},
                "code": {"text": "Hypertension"}
            }),
        ];
        for value in records {
            let record = Record::new(value);
            let extracted = extractor.extract(&record);
            let id = record.id().unwrap().to_string();
            store
                .put(fhirflow_storage::StoredRecord::new(&record, extracted, id))
                .unwrap();
        }
        store
    }

    #[test]
    fn test_parse_fields() {
        assert_eq!(
            parse_fields("code.text, status ,,id"),
            vec!["code.text", "status", "id"]
        );
        assert!(parse_fields(" , ").is_empty());
    }

    #[test]
    fn test_list_unfiltered_returns_extracted_documents() {
        let store = store_fixture();
        let service = QueryService::new(&store);

        let documents = service.list(&ListParams::default()).unwrap();
        assert_eq!(documents.len(), 3);
        assert_eq!(documents[0]["id"], json!("obs-1"));
        // absent extracted fields are not serialized into the document
        assert!(!documents[0].contains_key("effectiveDateTime"));
    }

    #[test]
    fn test_list_filters_by_resource_type() {
        let store = store_fixture();
        let service = QueryService::new(&store);

        let params = ListParams {
            resource_type: Some("Condition".to_string()),
            ..Default::default()
        };
        let documents = service.list(&params).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0]["id"], json!("cond-1"));
    }

    #[test]
    fn test_list_filters_by_subject_full_and_bare() {
        let store = store_fixture();
        let service = QueryService::new(&store);

        let full = ListParams {
            subject: Some("Patient/PT-1".to_string()),
            ..Default::default()
        };
        assert_eq!(service.list(&full).unwrap().len(), 2);

        let bare = ListParams {
            subject: Some("PT-2".to_string()),
            ..Default::default()
        };
        let documents = service.list(&bare).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0]["id"], json!("obs-2"));
    }

    #[test]
    fn test_list_projects_requested_paths() {
        let store = store_fixture();
        let service = QueryService::new(&store);

        let params = ListParams {
            resource_type: Some("Observation".to_string()),
            fields: Some(parse_fields("code.text,status")),
            ..Default::default()
        };
        let documents = service.list(&params).unwrap();

        assert_eq!(documents[0]["code.text"], json!("BP"));
        assert_eq!(documents[0]["status"], json!("final"));
        assert_eq!(documents[0].len(), 2);
    }

    #[test]
    fn test_projection_omits_unresolvable_fields() {
        let store = store_fixture();
        let service = QueryService::new(&store);

        let params = ListParams {
            resource_type: Some("Condition".to_string()),
            fields: Some(parse_fields("status,code.text")),
            ..Default::default()
        };
        let documents = service.list(&params).unwrap();
        // Condition has no stored status value; no null placeholder appears
        assert!(!documents[0].contains_key("status"));
        assert_eq!(documents[0]["code.text"], json!("Hypertension"));
    }

    #[test]
    fn test_get_by_id_returns_raw_record() {
        let store = store_fixture();
        let service = QueryService::new(&store);

        let document = service.get_by_id("obs-1", None).unwrap();
        assert_eq!(document["id"], json!("obs-1"));
        assert_eq!(document["code"]["coding"][0]["code"], json!("85354-9"));
    }

    #[test]
    fn test_get_by_id_with_projection_keeps_id() {
        let store = store_fixture();
        let service = QueryService::new(&store);

        let fields = parse_fields("code.coding[0].code");
        let document = service.get_by_id("obs-1", Some(&fields)).unwrap();
        assert_eq!(document["code.coding[0].code"], json!("85354-9"));
        assert_eq!(document["id"], json!("obs-1"));
    }

    #[test]
    fn test_get_by_id_not_found() {
        let store = store_fixture();
        let service = QueryService::new(&store);

        let err = service.get_by_id("missing", None).unwrap_err();
        assert!(matches!(err, EngineError::RecordNotFound { .. }));
    }
}
