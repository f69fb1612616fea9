use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Store(#[from] journal_store::StoreError),
}

pub type Result<T> = std::result::Result<T, TaskError>;

impl From<TaskError> for journal_core::JournalError {
    fn from(e: TaskError) -> Self {
        match e {
            TaskError::Store(e) => e.into(),
        }
    }
}
