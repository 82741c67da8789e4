use thiserror::Error;

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Record already exists: {id}")]
    AlreadyExists { id: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Backend error: {message}")]
    Backend { message: String },
}

impl StorageError {
    /// Create a new AlreadyExists error
    pub fn already_exists(id: impl Into<String>) -> Self {
        Self::AlreadyExists { id: id.into() }
    }

    /// Create a new Backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Whether the error indicates a conflicting identifier rather than an
    /// infrastructure failure.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

/// Convenience result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_exists_error() {
        let err = StorageError::already_exists("obs-001");
        assert_eq!(err.to_string(), "Record already exists: obs-001");
        assert!(err.is_conflict());
    }

    #[test]
    fn test_backend_error_is_not_conflict() {
        let err = StorageError::backend("connection refused");
        assert!(!err.is_conflict());
        assert_eq!(err.to_string(), "Backend error: connection refused");
    }
}
