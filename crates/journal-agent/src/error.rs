use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Store(#[from] journal_store::StoreError),

    #[error(transparent)]
    Draft(#[from] journal_drafts::DraftError),

    #[error(transparent)]
    Task(#[from] journal_tasks::TaskError),

    #[error(transparent)]
    Template(#[from] journal_templates::TemplateError),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream LLM unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("upstream LLM timed out")]
    UpstreamTimeout,

    #[error("the model's reply could not be parsed as structured content")]
    StructuringFailed,
}

pub type Result<T> = std::result::Result<T, AgentError>;

impl From<AgentError> for journal_core::JournalError {
    fn from(e: AgentError) -> Self {
        match e {
            AgentError::Store(e) => e.into(),
            AgentError::Draft(e) => e.into(),
            AgentError::Task(e) => e.into(),
            AgentError::Template(e) => e.into(),
            AgentError::Database(e) => journal_core::JournalError::Database(e),
            AgentError::NotFound(msg) => journal_core::JournalError::NotFound(msg),
            AgentError::UpstreamUnavailable(msg) => journal_core::JournalError::UpstreamUnavailable(msg),
            AgentError::UpstreamTimeout => journal_core::JournalError::UpstreamTimeout,
            AgentError::StructuringFailed => {
                journal_core::JournalError::Internal("structuring failed".into())
            }
        }
    }
}
