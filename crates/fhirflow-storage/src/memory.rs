//! In-memory record store backend.

use std::collections::HashSet;
use std::sync::RwLock;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::StorageError;
use crate::traits::RecordStore;
use crate::types::StoredRecord;

/// An in-memory `RecordStore` backed by an insertion-ordered map.
///
/// Insertion order is preserved so listings and analytics are deterministic
/// under re-run on unchanged data.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<IndexMap<String, StoredRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn put(&self, record: StoredRecord) -> Result<(), StorageError> {
        let mut records = self.records.write().map_err(|_| StorageError::LockPoisoned)?;
        if records.contains_key(&record.id) {
            return Err(StorageError::already_exists(&record.id));
        }
        debug!(id = %record.id, resource_type = %record.resource_type, "stored record");
        records.insert(record.id.clone(), record);
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<StoredRecord>, StorageError> {
        let records = self.records.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(records.get(id).cloned())
    }

    fn contains(&self, id: &str) -> Result<bool, StorageError> {
        let records = self.records.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(records.contains_key(id))
    }

    fn existing_ids(&self) -> Result<HashSet<String>, StorageError> {
        let records = self.records.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(records.keys().cloned().collect())
    }

    fn all(&self) -> Result<Vec<StoredRecord>, StorageError> {
        let records = self.records.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(records.values().cloned().collect())
    }

    fn len(&self) -> Result<usize, StorageError> {
        let records = self.records.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(records.len())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhirflow_core::{ExtractedIndex, Record};
    use serde_json::json;

    fn stored(id: &str, resource_type: &str) -> StoredRecord {
        let record = Record::new(json!({
            "id": id,
            "resourceType": resource_type,
            "subject": {"reference": "Patient/PT-001"}
        }));
        StoredRecord::new(&record, ExtractedIndex::new(), id)
    }

    #[test]
    fn test_put_and_get() {
        let store = MemoryStore::new();
        store.put(stored("obs-001", "Observation")).unwrap();

        let record = store.get("obs-001").unwrap().unwrap();
        assert_eq!(record.resource_type, "Observation");
        assert!(store.get("obs-002").unwrap().is_none());
    }

    #[test]
    fn test_put_rejects_existing_id() {
        let store = MemoryStore::new();
        store.put(stored("obs-001", "Observation")).unwrap();

        let err = store.put(stored("obs-001", "Condition")).unwrap_err();
        assert!(err.is_conflict());

        // the original content survives
        let record = store.get("obs-001").unwrap().unwrap();
        assert_eq!(record.resource_type, "Observation");
    }

    #[test]
    fn test_existing_ids_snapshot() {
        let store = MemoryStore::new();
        store.put(stored("a", "Observation")).unwrap();
        store.put(stored("b", "Condition")).unwrap();

        let ids = store.existing_ids().unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("a"));
        assert!(ids.contains("b"));
    }

    #[test]
    fn test_all_preserves_insertion_order() {
        let store = MemoryStore::new();
        store.put(stored("c", "Observation")).unwrap();
        store.put(stored("a", "Condition")).unwrap();
        store.put(stored("b", "Procedure")).unwrap();

        let ids: Vec<String> = store.all().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_len_and_is_empty() {
        let store = MemoryStore::new();
        assert!(store.is_empty().unwrap());

        store.put(stored("a", "Observation")).unwrap();
        assert_eq!(store.len().unwrap(), 1);
        assert!(!store.is_empty().unwrap());
    }
}
