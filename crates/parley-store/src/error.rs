//! Error types for the persistence layer.

use parley_core::error::ParleyError;

/// Errors from the storage and export layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("export error: {0}")]
    Export(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<StoreError> for ParleyError {
    fn from(err: StoreError) -> Self {
        ParleyError::Storage(err.to_string())
    }
}
