use chrono::{Duration, Utc};
use tracing::instrument;

use journal_core::config::AuthConfig;
use journal_store::types::User;
use journal_store::{Store, Tx};

use crate::error::{AuthError, Result};
use crate::password::{hash_password, verify_password};
use crate::token::{generate_token, hash_token};

/// Concrete realization of the auth primitives: `require_user(request) ->
/// user_id` and `issue_token(user_id) -> (token, expiry)`.
pub struct AuthService<'a> {
    store: &'a Store,
    config: &'a AuthConfig,
}

pub struct IssuedToken {
    pub token: String,
    pub expires_at: String,
    pub expires_in: i64,
}

impl<'a> AuthService<'a> {
    pub fn new(store: &'a Store, config: &'a AuthConfig) -> Self {
        Self { store, config }
    }

    #[instrument(skip(self, tx, password))]
    pub fn register(
        &self,
        tx: &Tx<'_>,
        username: &str,
        email: Option<&str>,
        password: &str,
    ) -> Result<User> {
        let hash = hash_password(password)?;
        self.store
            .create_user(tx, username, email, &hash)
            .map_err(|e| match e {
                journal_store::StoreError::Conflict(_) => {
                    AuthError::UsernameTaken(username.to_string())
                }
                other => AuthError::Store(other),
            })
    }

    #[instrument(skip(self, tx, password))]
    pub fn login(&self, tx: &Tx<'_>, username: &str, password: &str) -> Result<(User, IssuedToken)> {
        let user = self
            .store
            .get_user_by_username(tx, username)?
            .filter(|u| u.is_active)
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let issued = self.issue_token(tx, &user.id, None, None)?;
        Ok((user, issued))
    }

    /// Issues a fresh bearer token for `user_id`, persisting only its digest.
    #[instrument(skip(self, tx))]
    pub fn issue_token(
        &self,
        tx: &Tx<'_>,
        user_id: &str,
        user_agent: Option<&str>,
        ip: Option<&str>,
    ) -> Result<IssuedToken> {
        let token = generate_token();
        let token_hash = hash_token(&token);
        let lifetime = self.config.token_lifetime_secs;
        let expires_at = (Utc::now() + Duration::seconds(lifetime)).to_rfc3339();

        self.store
            .create_auth_session(tx, user_id, &token_hash, &expires_at, user_agent, ip)?;

        Ok(IssuedToken {
            token,
            expires_at,
            expires_in: lifetime,
        })
    }

    /// Validates a bearer token and resolves it to the owning `user_id`.
    /// This is the `require_user(request) -> user_id` collaborator.
    #[instrument(skip(self, tx, token))]
    pub fn require_user(&self, tx: &Tx<'_>, token: &str) -> Result<String> {
        let token_hash = hash_token(token);
        let session = self
            .store
            .get_auth_session_by_token_hash(tx, &token_hash)?
            .ok_or(AuthError::TokenInvalid)?;

        if session.revoked {
            return Err(AuthError::TokenInvalid);
        }
        let expires_at = chrono::DateTime::parse_from_rfc3339(&session.expires_at)
            .map_err(|e| AuthError::Hash(e.to_string()))?;
        if Utc::now() >= expires_at {
            return Err(AuthError::TokenInvalid);
        }

        let user = self
            .store
            .get_user_by_id(tx, &session.user_id)?
            .filter(|u| u.is_active)
            .ok_or(AuthError::TokenInvalid)?;

        Ok(user.id)
    }

    #[instrument(skip(self, tx, token))]
    pub fn logout(&self, tx: &Tx<'_>, token: &str) -> Result<()> {
        let token_hash = hash_token(token);
        if let Some(session) = self.store.get_auth_session_by_token_hash(tx, &token_hash)? {
            self.store.revoke_auth_session(tx, &session.id)?;
        }
        Ok(())
    }
}
