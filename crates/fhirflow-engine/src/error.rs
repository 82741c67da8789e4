use thiserror::Error;

use fhirflow_core::CoreError;
use fhirflow_storage::StorageError;

/// Errors raised by the processing engines.
///
/// Per-record validation issues and duplicate rejections are data carried in
/// reports, not errors — they never abort the rest of a batch. A malformed
/// transform spec aborts the whole transform request before any record is
/// touched.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Record not found: {id}")]
    RecordNotFound { id: String },

    #[error("Malformed transform spec: {message}")]
    MalformedTransformSpec { message: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl EngineError {
    /// Create a new RecordNotFound error
    pub fn record_not_found(id: impl Into<String>) -> Self {
        Self::RecordNotFound { id: id.into() }
    }

    /// Create a new MalformedTransformSpec error
    pub fn malformed_spec(message: impl Into<String>) -> Self {
        Self::MalformedTransformSpec {
            message: message.into(),
        }
    }
}

/// Convenience result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
