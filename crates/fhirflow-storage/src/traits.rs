//! The storage trait implemented by all record store backends.

use std::collections::HashSet;

use crate::error::StorageError;
use crate::types::StoredRecord;

/// A durable store of accepted records, keyed by record id.
///
/// Implementations must be thread-safe (`Send + Sync`). Writes are
/// insert-only: a record id, once stored, is never overwritten by a later
/// import. The deduplicator rejects colliding imports before they reach
/// the store; `put` still refuses them.
pub trait RecordStore: Send + Sync {
    /// Inserts a new record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if the id is already stored.
    fn put(&self, record: StoredRecord) -> Result<(), StorageError>;

    /// Reads a record by id. Returns `None` if the id is absent; errors are
    /// reserved for infrastructure failures.
    fn get(&self, id: &str) -> Result<Option<StoredRecord>, StorageError>;

    /// Whether a record with this id is stored.
    fn contains(&self, id: &str) -> Result<bool, StorageError>;

    /// A snapshot of every stored id, taken atomically. Handed to the
    /// deduplicator at the start of batch resolution.
    fn existing_ids(&self) -> Result<HashSet<String>, StorageError>;

    /// All stored records in insertion order.
    fn all(&self) -> Result<Vec<StoredRecord>, StorageError>;

    /// Number of stored records.
    fn len(&self) -> Result<usize, StorageError>;

    /// Whether the store holds no records.
    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }

    /// Name of this backend for logging.
    fn backend_name(&self) -> &'static str;
}
