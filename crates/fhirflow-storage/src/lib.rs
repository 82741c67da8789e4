//! Storage abstraction layer for fhirflow.
//!
//! Defines the `RecordStore` trait that all backends implement, the
//! `StoredRecord` type handed to them by the import pipeline, and an
//! in-memory backend used for tests and single-process deployments.
//!
//! The trait is synchronous: the engines treat storage reads and writes as
//! opaque blocking calls with their own transactional guarantees.

pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::{Result, StorageError};
pub use memory::MemoryStore;
pub use traits::RecordStore;
pub use types::StoredRecord;

/// Type alias for a shareable `RecordStore` instance.
pub type DynRecordStore = std::sync::Arc<dyn RecordStore>;

/// Creates a new in-memory `RecordStore` instance.
pub fn create_memory_store() -> DynRecordStore {
    std::sync::Arc::new(MemoryStore::new())
}
