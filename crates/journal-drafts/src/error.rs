use thiserror::Error;

#[derive(Debug, Error)]
pub enum DraftError {
    #[error(transparent)]
    Store(#[from] journal_store::StoreError),

    #[error("cannot finalize an empty draft")]
    EmptyDraft,
}

pub type Result<T> = std::result::Result<T, DraftError>;

impl From<DraftError> for journal_core::JournalError {
    fn from(e: DraftError) -> Self {
        match e {
            DraftError::Store(e) => e.into(),
            DraftError::EmptyDraft => {
                journal_core::JournalError::Conflict("draft has no content to finalize".into())
            }
        }
    }
}
