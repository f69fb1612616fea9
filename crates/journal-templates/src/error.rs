use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error(transparent)]
    Store(#[from] journal_store::StoreError),

    #[error("failed to read default template from {path}: {source}")]
    Reload {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed template source: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, TemplateError>;

impl From<TemplateError> for journal_core::JournalError {
    fn from(e: TemplateError) -> Self {
        match e {
            TemplateError::Store(e) => e.into(),
            TemplateError::Reload { .. } | TemplateError::Malformed(_) => {
                journal_core::JournalError::Internal(e.to_string())
            }
        }
    }
}
