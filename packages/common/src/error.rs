use thiserror::Error;

/// Errors raised by a [`RowStore`](crate::RowStore) backend
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Row not found: {table}/{id}")]
    NotFound { table: String, id: String },

    #[error("Row is not a JSON object: {0}")]
    InvalidRow(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn not_found(table: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            table: table.into(),
            id: id.into(),
        }
    }
}

impl From<String> for StorageError {
    fn from(s: String) -> Self {
        StorageError::Backend(s)
    }
}

impl From<&str> for StorageError {
    fn from(s: &str) -> Self {
        StorageError::Backend(s.to_string())
    }
}
