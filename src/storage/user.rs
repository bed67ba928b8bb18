//! User and session storage. Hashing lives in `auth`; this layer stores what it's given.

use jiff::Timestamp;
use rusqlite::{OptionalExtension, Row};
use tracing::info;
use uuid::Uuid;

use crate::model::{Role, User};

use super::{Result, Storage, StorageError, parse_id, parse_timestamp};

/// A stored password hash and the salt it was made with.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub password_hash: String,
    pub salt: String,
}

impl Storage {
    /// Inserts a user. Emails are unique, case-insensitively.
    pub fn insert_user(&self, email: &str, role: Role, credentials: &Credentials) -> Result<User> {
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role,
            created_at: Timestamp::now(),
        };
        let result = self.open_db()?.execute(
            "INSERT INTO user (id, email, password_hash, salt, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                user.id.to_string(),
                &user.email,
                &credentials.password_hash,
                &credentials.salt,
                role.as_str(),
                user.created_at.to_string(),
            ],
        );
        match result {
            Ok(_) => {
                info!(email, role = role.as_str(), "user created");
                Ok(user)
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StorageError::UserExists(email.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Looks up a user and their credentials by email.
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<(User, Credentials)>> {
        let row = self
            .open_db()?
            .query_row(
                "SELECT id, email, role, created_at, password_hash, salt
                 FROM user WHERE email = ?1",
                [email],
                |row| {
                    Ok((
                        read_user(row)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(user, password_hash, salt)| {
            Ok((
                into_user(user)?,
                Credentials {
                    password_hash,
                    salt,
                },
            ))
        })
        .transpose()
    }

    pub fn insert_session(&self, token: &str, user_id: Uuid) -> Result<()> {
        self.open_db()?.execute(
            "INSERT INTO session (token, user_id, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![token, user_id.to_string(), Timestamp::now().to_string()],
        )?;
        Ok(())
    }

    /// The user a session token belongs to, if the session exists.
    pub fn session_user(&self, token: &str) -> Result<Option<User>> {
        let row = self
            .open_db()?
            .query_row(
                "SELECT u.id, u.email, u.role, u.created_at
                 FROM session s JOIN user u ON u.id = s.user_id
                 WHERE s.token = ?1",
                [token],
                read_user,
            )
            .optional()?;
        row.map(into_user).transpose()
    }

    pub fn remove_session(&self, token: &str) -> Result<()> {
        self.open_db()?
            .execute("DELETE FROM session WHERE token = ?1", [token])?;
        Ok(())
    }
}

type UserColumns = (String, String, String, String);

fn read_user(row: &Row<'_>) -> rusqlite::Result<UserColumns> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn into_user((id, email, role, created_at): UserColumns) -> Result<User> {
    Ok(User {
        id: parse_id("user id", &id)?,
        email,
        role: Role::from_stored(&role),
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::storage::tests::test_storage;

    fn sample_credentials() -> Credentials {
        Credentials {
            password_hash: "ab12".into(),
            salt: "cd34".into(),
        }
    }

    #[test]
    fn insert_and_find_user() {
        let (_dir, storage) = test_storage();
        let user = storage
            .insert_user("ana@example.com", Role::Admin, &sample_credentials())
            .unwrap();

        let (found, creds) = storage
            .find_user_by_email("ANA@example.com")
            .unwrap()
            .unwrap();

        assert_eq!(found, user);
        assert_eq!(creds.password_hash, "ab12");
        assert_eq!(creds.salt, "cd34");
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let (_dir, storage) = test_storage();
        storage
            .insert_user("ana@example.com", Role::User, &sample_credentials())
            .unwrap();
        let err = storage
            .insert_user("Ana@Example.com", Role::User, &sample_credentials())
            .unwrap_err();

        assert!(matches!(err, StorageError::UserExists(_)));
    }

    #[test]
    fn unknown_email_is_none() {
        let (_dir, storage) = test_storage();
        assert!(storage.find_user_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn sessions_resolve_to_their_user_until_removed() {
        let (_dir, storage) = test_storage();
        let user = storage
            .insert_user("ana@example.com", Role::User, &sample_credentials())
            .unwrap();

        storage.insert_session("tok", user.id).unwrap();
        assert_eq!(storage.session_user("tok").unwrap(), Some(user));
        assert_eq!(storage.session_user("other").unwrap(), None);

        storage.remove_session("tok").unwrap();
        assert_eq!(storage.session_user("tok").unwrap(), None);
    }
}
