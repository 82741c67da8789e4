//! Record processing engines for fhirflow.
//!
//! Control flow for an import: a batch is parsed into individual records,
//! each passes through the `ValidationEngine`, valid records get their flat
//! field index from the `ExtractionEngine`, the `Deduplicator` resolves
//! identifier collisions, and accepted records are handed to the record
//! store. Queries project stored records path-by-path; transforms run the
//! `TransformationPipeline` over a filtered in-memory set and return the
//! result without storing it.

pub mod analytics;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod import;
pub mod query;
pub mod transform;
pub mod validate;

pub use analytics::{AnalyticsAggregator, AnalyticsReport, MissingFieldCount};
pub use dedup::{DedupDecision, Deduplicator};
pub use error::{EngineError, Result};
pub use extract::ExtractionEngine;
pub use import::{ImportReport, Importer, LineOutcome, LineStatus, RejectionKind};
pub use query::{ListParams, QueryService, parse_fields};
pub use transform::{
    TransformFilters, TransformService, TransformSpec, TransformStep, TransformationPipeline,
};
pub use validate::{ValidationEngine, ValidationIssue, ValidationOutcome};
