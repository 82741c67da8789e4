//! Analytics over the stored record collection.
//!
//! All aggregations are deterministic: grouped counts are emitted in sorted
//! key order and the missing-field ranking breaks count ties by field name,
//! so re-running on unchanged data yields identical output.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use fhirflow_storage::{RecordStore, StoredRecord};

use crate::error::Result;

/// How many missing-field entries the ranking reports.
const MISSING_FIELDS_TOP: usize = 5;

/// One entry of the missing-field ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingFieldCount {
    pub field: String,
    pub count: u64,
}

/// The full analytics result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    /// Total number of stored records.
    #[serde(rename = "totalRecords")]
    pub total_records: usize,
    /// Record counts grouped by resource type, keys sorted ascending.
    #[serde(rename = "recordsByResourceType")]
    pub records_by_resource_type: IndexMap<String, u64>,
    /// Count of distinct subject references.
    #[serde(rename = "uniqueSubjects")]
    pub unique_subjects: usize,
    /// The five field names with the most absence markers across all
    /// extracted indexes, count descending, ties by name ascending.
    #[serde(rename = "missingFieldsTop5")]
    pub missing_fields_top5: Vec<MissingFieldCount>,
}

/// Computes the analytics report over a record store.
pub struct AnalyticsAggregator<'a> {
    store: &'a dyn RecordStore,
}

impl<'a> AnalyticsAggregator<'a> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self { store }
    }

    /// Aggregates over the current store contents.
    pub fn report(&self) -> Result<AnalyticsReport> {
        let records = self.store.all()?;
        let report = aggregate(&records);
        debug!(total = report.total_records, "analytics report computed");
        Ok(report)
    }
}

/// Pure aggregation over a stored record collection.
pub fn aggregate(records: &[StoredRecord]) -> AnalyticsReport {
    let mut by_type: BTreeMap<&str, u64> = BTreeMap::new();
    let mut subjects: BTreeSet<&str> = BTreeSet::new();
    let mut missing: BTreeMap<&str, u64> = BTreeMap::new();

    for record in records {
        *by_type.entry(record.resource_type.as_str()).or_insert(0) += 1;
        if let Some(reference) = &record.subject_reference {
            subjects.insert(reference.as_str());
        }
        for field in record.extracted.absent_fields() {
            *missing.entry(field).or_insert(0) += 1;
        }
    }

    let mut ranking: Vec<MissingFieldCount> = missing
        .into_iter()
        .map(|(field, count)| MissingFieldCount {
            field: field.to_string(),
            count,
        })
        .collect();
    // BTreeMap iteration already orders names ascending; a stable sort by
    // descending count preserves that as the tie-break
    ranking.sort_by(|a, b| b.count.cmp(&a.count));
    ranking.truncate(MISSING_FIELDS_TOP);

    AnalyticsReport {
        total_records: records.len(),
        records_by_resource_type: by_type
            .into_iter()
            .map(|(resource_type, count)| (resource_type.to_string(), count))
            .collect(),
        unique_subjects: subjects.len(),
        missing_fields_top5: ranking,
    }
}
