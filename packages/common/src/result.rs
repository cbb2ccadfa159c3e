use crate::error::StorageError;

/// Common Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
