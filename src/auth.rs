//! Accounts and sessions.
//!
//! Passwords are stored as hex SHA-256 of a per-user random salt followed by
//! the password. A successful login mints an opaque bearer token that maps to
//! a session row; that token is what the API and the CLI carry around.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    model::{Role, User},
    storage::{Credentials, Storage, StorageError},
};

/// Shortest password `register` accepts.
pub const PASSWORD_MIN: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    #[error("password must be at least {PASSWORD_MIN} characters")]
    WeakPassword,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("missing or expired session")]
    InvalidSession,

    #[error("only admins can modify journeys")]
    Forbidden,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T> = core::result::Result<T, AuthError>;

/// A logged-in user and the token that proves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Creates an account.
pub fn register(storage: &Storage, email: &str, password: &str, role: Role) -> Result<User> {
    let email = email.trim();
    if !is_plausible_email(email) {
        return Err(AuthError::InvalidEmail(email.to_string()));
    }
    if password.chars().count() < PASSWORD_MIN {
        return Err(AuthError::WeakPassword);
    }
    let salt = Uuid::new_v4().simple().to_string();
    let credentials = Credentials {
        password_hash: hash_password(&salt, password),
        salt,
    };
    Ok(storage.insert_user(email, role, &credentials)?)
}

/// Checks credentials and opens a session.
pub fn login(storage: &Storage, email: &str, password: &str) -> Result<Session> {
    let Some((user, credentials)) = storage.find_user_by_email(email.trim())? else {
        warn!(email, "login for unknown email");
        return Err(AuthError::InvalidCredentials);
    };
    if hash_password(&credentials.salt, password) != credentials.password_hash {
        warn!(email, "login with wrong password");
        return Err(AuthError::InvalidCredentials);
    }
    let token = new_token();
    storage.insert_session(&token, user.id)?;
    info!(email = %user.email, "user logged in");
    Ok(Session { token, user })
}

/// Resolves a bearer token to its user.
pub fn authenticate(storage: &Storage, token: &str) -> Result<User> {
    storage
        .session_user(token)?
        .ok_or(AuthError::InvalidSession)
}

/// Ends a session. Unknown tokens are ignored.
pub fn logout(storage: &Storage, token: &str) -> Result<()> {
    storage.remove_session(token)?;
    info!("session closed");
    Ok(())
}

/// Fails unless the user may mutate journeys.
pub fn require_mutation(user: &User) -> Result<()> {
    if user.role.can_mutate() {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn new_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !email.contains(' '),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::storage::tests::test_storage;

    #[test]
    fn register_then_login() {
        let (_dir, storage) = test_storage();
        let user = register(&storage, "ana@example.com", "correct horse", Role::Admin).unwrap();

        let session = login(&storage, "ana@example.com", "correct horse").unwrap();

        assert_eq!(session.user, user);
        assert_eq!(session.token.len(), 64);
        assert_eq!(authenticate(&storage, &session.token).unwrap(), user);
    }

    #[test]
    fn logout_invalidates_the_token() {
        let (_dir, storage) = test_storage();
        register(&storage, "ana@example.com", "correct horse", Role::User).unwrap();
        let session = login(&storage, "ana@example.com", "correct horse").unwrap();

        logout(&storage, &session.token).unwrap();

        assert!(matches!(
            authenticate(&storage, &session.token),
            Err(AuthError::InvalidSession)
        ));
        logout(&storage, &session.token).unwrap();
    }

    #[test]
    fn wrong_password_and_unknown_email_look_the_same() {
        let (_dir, storage) = test_storage();
        register(&storage, "ana@example.com", "correct horse", Role::User).unwrap();

        let wrong = login(&storage, "ana@example.com", "battery staple").unwrap_err();
        let unknown = login(&storage, "bob@example.com", "correct horse").unwrap_err();

        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[test]
    fn register_rejects_bad_input() {
        let (_dir, storage) = test_storage();
        assert!(matches!(
            register(&storage, "not-an-email", "long enough", Role::User),
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            register(&storage, "ana@example.com", "short", Role::User),
            Err(AuthError::WeakPassword)
        ));
        register(&storage, "ana@example.com", "long enough", Role::User).unwrap();
        assert!(matches!(
            register(&storage, "ana@example.com", "long enough", Role::User),
            Err(AuthError::Storage(StorageError::UserExists(_)))
        ));
    }

    #[test]
    fn same_password_hashes_differently_per_user() {
        assert_ne!(hash_password("salt-a", "pw"), hash_password("salt-b", "pw"));
        assert_eq!(hash_password("salt-a", "pw"), hash_password("salt-a", "pw"));
    }

    #[test]
    fn unknown_token_is_invalid() {
        let (_dir, storage) = test_storage();
        assert!(matches!(
            authenticate(&storage, "nope"),
            Err(AuthError::InvalidSession)
        ));
    }

    #[test]
    fn only_admins_may_mutate() {
        let (_dir, storage) = test_storage();
        let admin = register(&storage, "a@example.com", "password1", Role::Admin).unwrap();
        let viewer = register(&storage, "v@example.com", "password1", Role::User).unwrap();

        assert!(require_mutation(&admin).is_ok());
        assert!(matches!(require_mutation(&viewer), Err(AuthError::Forbidden)));
    }
}
