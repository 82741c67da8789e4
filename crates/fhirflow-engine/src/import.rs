//! The import pipeline.
//!
//! Parses a JSONL batch into individual records, validates each against the
//! rule set, builds the flat field index for the valid ones, resolves
//! identifier collisions, and hands accepted records to the store. Records
//! are processed strictly in submission order — the deduplicator's
//! last-write-wins tie-break depends on it.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use fhirflow_config::{ExtractionConfig, ValidationRuleSet};
use fhirflow_core::Record;
use fhirflow_storage::{RecordStore, StorageError, StoredRecord};

use crate::dedup::{DedupDecision, Deduplicator};
use crate::error::Result;
use crate::extract::ExtractionEngine;
use crate::validate::ValidationEngine;

/// The maximum number of patient references echoed back in statistics.
const PATIENT_REFERENCE_SAMPLE: usize = 100;

/// Per-line disposition of an import batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    /// Validated, deduplicated and stored.
    Accepted,
    /// Rejected with at least one error.
    Rejected,
    /// Discarded silently: a later line in the same batch carries the same
    /// id (last-write-wins).
    Superseded,
}

/// Why a line was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    Parse,
    Validation,
    Duplicate,
}

/// The outcome for a single batch line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineOutcome {
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub status: LineStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<RejectionKind>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<String>,
}

impl LineOutcome {
    fn accepted(line: usize, id: String) -> Self {
        Self {
            line,
            id: Some(id),
            status: LineStatus::Accepted,
            kind: None,
            errors: Vec::new(),
        }
    }

    fn rejected(line: usize, id: Option<String>, kind: RejectionKind, errors: Vec<String>) -> Self {
        Self {
            line,
            id,
            status: LineStatus::Rejected,
            kind: Some(kind),
            errors,
        }
    }

    fn superseded(line: usize, id: String) -> Self {
        Self {
            line,
            id: Some(id),
            status: LineStatus::Superseded,
            kind: None,
            errors: Vec::new(),
        }
    }
}

/// Aggregate statistics over the accepted records of one batch.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ImportStatistics {
    /// Accepted record counts keyed by resource type, in encounter order.
    #[serde(rename = "resourceTypes")]
    pub resource_types: IndexMap<String, u64>,
    /// Number of distinct patient ids seen across accepted records.
    #[serde(rename = "uniquePatients")]
    pub unique_patients: usize,
    /// A capped sample of the distinct patient ids.
    #[serde(rename = "patientReferences")]
    pub patient_references: Vec<String>,
}

/// A warning for a well-known optional field missing from an accepted
/// record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldWarning {
    pub line: usize,
    #[serde(rename = "resourceType")]
    pub resource_type: String,
    pub field: String,
}

/// The batch summary, stamped with a fresh id. Only this summary persists
/// downstream; the batch itself is discarded after the response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportLog {
    pub id: Uuid,
    #[serde(rename = "importedAt", with = "time::serde::rfc3339")]
    pub imported_at: OffsetDateTime,
    #[serde(rename = "totalLines")]
    pub total_lines: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub superseded: usize,
}

/// The full result of one import request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    #[serde(rename = "totalLines")]
    pub total_lines: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub superseded: usize,
    pub outcomes: Vec<LineOutcome>,
    pub statistics: ImportStatistics,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<FieldWarning>,
    pub log: ImportLog,
}

/// Parses JSONL content into numbered records. Blank lines are skipped;
/// malformed lines yield a per-line parse error instead of aborting the
/// batch.
pub fn parse_jsonl(content: &str) -> Vec<(usize, std::result::Result<Value, String>)> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            let parsed = serde_json::from_str::<Value>(line)
                .map_err(|e| format!("invalid JSON: {e}"));
            (index + 1, parsed)
        })
        .collect()
}

/// Optional fields worth flagging when absent, by resource type.
fn optional_field(resource_type: &str) -> Option<&'static str> {
    match resource_type {
        "Observation" => Some("effectiveDateTime"),
        "MedicationRequest" => Some("authoredOn"),
        _ => None,
    }
}

/// Orchestrates one import request end to end.
pub struct Importer<'a> {
    rules: &'a ValidationRuleSet,
    extraction: &'a ExtractionConfig,
    store: &'a dyn RecordStore,
}

struct Candidate {
    line: usize,
    record: Record,
    id: String,
    /// Index of this candidate's placeholder in the outcome list.
    slot: usize,
}

impl<'a> Importer<'a> {
    pub fn new(
        rules: &'a ValidationRuleSet,
        extraction: &'a ExtractionConfig,
        store: &'a dyn RecordStore,
    ) -> Self {
        Self {
            rules,
            extraction,
            store,
        }
    }

    /// Imports a JSONL batch and returns the per-line report.
    ///
    /// Validation and dedup failures are per-record and never abort the
    /// rest of the batch; only storage infrastructure failures do.
    pub fn import_jsonl(&self, content: &str) -> Result<ImportReport> {
        self.import_lines(parse_jsonl(content))
    }

    /// Imports an already-parsed sequence of raw records, e.g. a JSON array
    /// submitted in one request. Lines are numbered from 1.
    pub fn import_values(&self, values: Vec<Value>) -> Result<ImportReport> {
        let lines = values
            .into_iter()
            .enumerate()
            .map(|(index, value)| (index + 1, Ok(value)))
            .collect();
        self.import_lines(lines)
    }

    fn import_lines(
        &self,
        lines: Vec<(usize, std::result::Result<Value, String>)>,
    ) -> Result<ImportReport> {
        let validator = ValidationEngine::new(self.rules);
        let extractor = ExtractionEngine::new(self.extraction);

        let total_lines = lines.len();
        let mut outcomes: Vec<Option<LineOutcome>> = Vec::with_capacity(total_lines);
        let mut candidates: Vec<Candidate> = Vec::new();

        for (line, parsed) in lines {
            match parsed {
                Err(message) => {
                    outcomes.push(Some(LineOutcome::rejected(
                        line,
                        None,
                        RejectionKind::Parse,
                        vec![message],
                    )));
                }
                Ok(value) => {
                    let record = Record::new(value);
                    let verdict = validator.validate(&record);
                    if !verdict.is_valid() {
                        outcomes.push(Some(LineOutcome::rejected(
                            line,
                            record.id().map(str::to_string),
                            RejectionKind::Validation,
                            verdict.messages(),
                        )));
                        continue;
                    }
                    match record.id() {
                        Some(id) => {
                            let id = id.to_string();
                            // placeholder, filled in after dedup
                            let slot = outcomes.len();
                            outcomes.push(None);
                            candidates.push(Candidate {
                                line,
                                record,
                                id,
                                slot,
                            });
                        }
                        None => {
                            outcomes.push(Some(LineOutcome::rejected(
                                line,
                                None,
                                RejectionKind::Validation,
                                vec!["record has no usable 'id'".to_string()],
                            )));
                        }
                    }
                }
            }
        }

        // Resolve identifier collisions against an atomic snapshot of the
        // stored ids.
        let existing = self.store.existing_ids()?;
        let candidate_ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
        let decisions = Deduplicator::resolve(&candidate_ids, &existing);

        let mut statistics = ImportStatistics::default();
        let mut warnings = Vec::new();
        let mut patient_ids: Vec<String> = Vec::new();
        let mut accepted = 0usize;
        let mut superseded = 0usize;

        for (candidate, decision) in candidates.iter().zip(decisions) {
            let outcome = match decision {
                DedupDecision::SupersededInBatch => {
                    superseded += 1;
                    LineOutcome::superseded(candidate.line, candidate.id.clone())
                }
                DedupDecision::DuplicateInStorage => {
                    debug!(id = %candidate.id, "rejected duplicate of stored record");
                    LineOutcome::rejected(
                        candidate.line,
                        Some(candidate.id.clone()),
                        RejectionKind::Duplicate,
                        vec![format!("record '{}' already exists in storage", candidate.id)],
                    )
                }
                DedupDecision::Keep => {
                    let index = extractor.extract(&candidate.record);
                    let resource_type = candidate
                        .record
                        .resource_type()
                        .unwrap_or_default()
                        .to_string();

                    if let Some(field) = optional_field(&resource_type)
                        && index.get(field).is_none_or(|value| value.is_absent())
                    {
                        warnings.push(FieldWarning {
                            line: candidate.line,
                            resource_type: resource_type.clone(),
                            field: field.to_string(),
                        });
                    }

                    let stored =
                        StoredRecord::new(&candidate.record, index, candidate.id.clone());
                    match self.store.put(stored) {
                        Ok(()) => {
                            accepted += 1;
                            *statistics
                                .resource_types
                                .entry(resource_type)
                                .or_insert(0) += 1;
                            if let Some(patient) = candidate.record.patient_id()
                                && !patient_ids.iter().any(|p| p == patient)
                            {
                                patient_ids.push(patient.to_string());
                            }
                            LineOutcome::accepted(candidate.line, candidate.id.clone())
                        }
                        Err(StorageError::AlreadyExists { id }) => LineOutcome::rejected(
                            candidate.line,
                            Some(id.clone()),
                            RejectionKind::Duplicate,
                            vec![format!("record '{id}' already exists in storage")],
                        ),
                        Err(other) => return Err(other.into()),
                    }
                }
            };

            outcomes[candidate.slot] = Some(outcome);
        }

        statistics.unique_patients = patient_ids.len();
        patient_ids.truncate(PATIENT_REFERENCE_SAMPLE);
        statistics.patient_references = patient_ids;

        let outcomes: Vec<LineOutcome> = outcomes.into_iter().flatten().collect();
        let rejected = outcomes
            .iter()
            .filter(|o| o.status == LineStatus::Rejected)
            .count();

        let log = ImportLog {
            id: Uuid::new_v4(),
            imported_at: OffsetDateTime::now_utc(),
            total_lines,
            accepted,
            rejected,
            superseded,
        };

        info!(
            import = %log.id,
            total_lines,
            accepted,
            rejected,
            superseded,
            "import batch complete"
        );

        Ok(ImportReport {
            total_lines,
            accepted,
            rejected,
            superseded,
            outcomes,
            statistics,
            warnings,
            log,
        })
    }
}
