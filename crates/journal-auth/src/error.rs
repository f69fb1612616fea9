use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("token is expired or revoked")]
    TokenInvalid,

    #[error("username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error(transparent)]
    Store(#[from] journal_store::StoreError),
}

pub type Result<T> = std::result::Result<T, AuthError>;

impl From<AuthError> for journal_core::JournalError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => {
                journal_core::JournalError::Unauthorized
            }
            AuthError::TokenInvalid => journal_core::JournalError::Unauthorized,
            AuthError::UsernameTaken(u) => {
                journal_core::JournalError::Conflict(format!("username '{u}' is already taken"))
            }
            AuthError::Hash(m) => journal_core::JournalError::Internal(m),
            AuthError::Store(e) => e.into(),
        }
    }
}
