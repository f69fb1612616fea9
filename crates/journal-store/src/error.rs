use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for journal_core::JournalError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Database(e) => journal_core::JournalError::Database(e),
            StoreError::Serialization(e) => journal_core::JournalError::Serialization(e),
            StoreError::NotFound(m) => journal_core::JournalError::NotFound(m),
            StoreError::Conflict(m) => journal_core::JournalError::Conflict(m),
            StoreError::Validation(m) => journal_core::JournalError::Validation(m),
        }
    }
}
