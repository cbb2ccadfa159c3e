//! Error types for the editor

use thiserror::Error;
use widgetforge_common::StorageError;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("No document is open")]
    NoDocument,
}
