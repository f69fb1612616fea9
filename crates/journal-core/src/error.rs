use thiserror::Error;

/// The system-wide error taxonomy. Every variant carries a machine-readable
/// `code()` and renders a user-safe message; no raw exception text ever
/// reaches a client.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("upstream LLM timed out")]
    UpstreamTimeout,

    #[error("upstream LLM unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl JournalError {
    /// Short machine-readable code, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            JournalError::Validation(_) => "VALIDATION_ERROR",
            JournalError::Unauthorized => "UNAUTHORIZED",
            JournalError::Forbidden(_) => "FORBIDDEN",
            JournalError::NotFound(_) => "NOT_FOUND",
            JournalError::Conflict(_) => "CONFLICT",
            JournalError::UpstreamTimeout => "UPSTREAM_TIMEOUT",
            JournalError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            JournalError::Database(_) => "DATABASE_ERROR",
            JournalError::Serialization(_) => "SERIALIZATION_ERROR",
            JournalError::Config(_) => "CONFIG_ERROR",
            JournalError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status this error maps to at the edge.
    pub fn status_code(&self) -> u16 {
        match self {
            JournalError::Validation(_) => 400,
            JournalError::Unauthorized => 401,
            JournalError::Forbidden(_) => 403,
            JournalError::NotFound(_) => 404,
            JournalError::Conflict(_) => 409,
            JournalError::UpstreamTimeout | JournalError::UpstreamUnavailable(_) => 503,
            JournalError::Database(_)
            | JournalError::Serialization(_)
            | JournalError::Config(_)
            | JournalError::Internal(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, JournalError>;
