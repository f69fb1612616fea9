pub mod error;
pub mod password;
pub mod service;
pub mod token;

pub use error::{AuthError, Result};
pub use service::{AuthService, IssuedToken};

#[cfg(test)]
mod tests {
    use super::*;
    use journal_core::config::AuthConfig;
    use journal_store::Store;
    use rusqlite::Connection;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".into(),
            jwt_algorithm: "HS256".into(),
            token_lifetime_secs: 3600,
        }
    }

    #[test]
    fn register_then_login_round_trip() {
        let store = Store::new(Connection::open_in_memory().unwrap()).unwrap();
        let cfg = config();
        let auth = AuthService::new(&store, &cfg);

        let tx = store.begin().unwrap();
        auth.register(&tx, "alice", None, "correct horse battery staple").unwrap();
        let (user, issued) = auth.login(&tx, "alice", "correct horse battery staple").unwrap();
        assert_eq!(user.username, "alice");

        let resolved = auth.require_user(&tx, &issued.token).unwrap();
        assert_eq!(resolved, user.id);
        tx.commit().unwrap();
    }

    #[test]
    fn login_rejects_wrong_password() {
        let store = Store::new(Connection::open_in_memory().unwrap()).unwrap();
        let cfg = config();
        let auth = AuthService::new(&store, &cfg);

        let tx = store.begin().unwrap();
        auth.register(&tx, "bob", None, "hunter2-but-long-enough").unwrap();
        let err = auth.login(&tx, "bob", "wrong password").unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        tx.commit().unwrap();
    }

    #[test]
    fn logout_revokes_token() {
        let store = Store::new(Connection::open_in_memory().unwrap()).unwrap();
        let cfg = config();
        let auth = AuthService::new(&store, &cfg);

        let tx = store.begin().unwrap();
        auth.register(&tx, "carol", None, "another-long-password").unwrap();
        let (_, issued) = auth.login(&tx, "carol", "another-long-password").unwrap();
        auth.logout(&tx, &issued.token).unwrap();
        let err = auth.require_user(&tx, &issued.token).unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));
        tx.commit().unwrap();
    }
}
