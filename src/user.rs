//! Defines the application user and the database functions for managing
//! users. A user logs in with a username and password and owns exactly one
//! money [account](crate::Account).

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, password::PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to
/// better compile time errors and more flexible generics that can have
/// distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The underlying integer ID.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user's ID in the database.
    pub id: UserID,
    /// The unique name the user logs in with.
    pub username: String,
    /// The user's hashed password.
    pub password_hash: PasswordHash,
}

/// Create a user in the database.
///
/// The caller should ensure that `username` is not blank.
///
/// # Errors
/// Returns an [Error::DuplicateUsername] if the username is already taken, or
/// an [Error::SqlError] if there is some other SQL error.
pub fn create_user(
    username: &str,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<User, Error> {
    connection.execute(
        "INSERT INTO user (username, password) VALUES (?1, ?2)",
        (username, password_hash.to_string()),
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        username: username.to_string(),
        password_hash,
    })
}

/// Get the user that has the specified `id`.
///
/// # Errors
/// Returns an [Error::NotFound] if there is no user with `id`, or an
/// [Error::SqlError] if there is some other SQL error.
pub fn get_user_by_id(id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, username, password FROM user WHERE id = :id")?
        .query_row(&[(":id", &id.as_i64())], map_row)
        .map_err(|error| error.into())
}

/// Get the user that has the specified `username`.
///
/// # Errors
/// Returns an [Error::NotFound] if there is no user with `username`, or an
/// [Error::SqlError] if there is some other SQL error.
pub fn get_user_by_username(username: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, username, password FROM user WHERE username = :username")?
        .query_row(&[(":username", &username)], map_row)
        .map_err(|error| error.into())
}

/// Replace the stored password hash for the user with `id`.
///
/// # Errors
/// Returns an [Error::NotFound] if there is no user with `id`, or an
/// [Error::SqlError] if there is some other SQL error.
pub fn update_user_password(
    id: UserID,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET password = ?1 WHERE id = ?2",
        (password_hash.to_string(), id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

pub(crate) fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
            id INTEGER PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_id = row.get(0)?;
    let username = row.get(1)?;
    let raw_password_hash: String = row.get(2)?;

    Ok(User {
        id: UserID::new(raw_id),
        username,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
    })
}

#[cfg(test)]
mod user_tests {
    use rusqlite::Connection;

    use crate::{Error, db::initialize, password::PasswordHash};

    use super::{
        UserID, create_user, get_user_by_id, get_user_by_username, update_user_password,
    };

    fn get_test_db_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).expect("Could not initialize database");
        connection
    }

    #[test]
    fn create_user_succeeds() {
        let connection = get_test_db_connection();
        let password_hash = PasswordHash::new_unchecked("hunter2");

        let user = create_user("alice", password_hash.clone(), &connection).unwrap();

        assert!(user.id.as_i64() > 0);
        assert_eq!(user.username, "alice");
        assert_eq!(user.password_hash, password_hash);
    }

    #[test]
    fn create_user_fails_on_duplicate_username() {
        let connection = get_test_db_connection();

        create_user("alice", PasswordHash::new_unchecked("hunter2"), &connection).unwrap();

        let duplicate = create_user("alice", PasswordHash::new_unchecked("hunter3"), &connection);

        assert_eq!(duplicate, Err(Error::DuplicateUsername));
    }

    #[test]
    fn get_user_by_id_succeeds() {
        let connection = get_test_db_connection();
        let user =
            create_user("alice", PasswordHash::new_unchecked("hunter2"), &connection).unwrap();

        let retrieved_user = get_user_by_id(user.id, &connection).unwrap();

        assert_eq!(retrieved_user, user);
    }

    #[test]
    fn get_user_by_id_fails_with_non_existent_id() {
        let connection = get_test_db_connection();

        let result = get_user_by_id(UserID::new(42), &connection);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn get_user_by_username_succeeds() {
        let connection = get_test_db_connection();
        let user =
            create_user("alice", PasswordHash::new_unchecked("hunter2"), &connection).unwrap();

        let retrieved_user = get_user_by_username("alice", &connection).unwrap();

        assert_eq!(retrieved_user, user);
    }

    #[test]
    fn get_user_by_username_fails_with_non_existent_username() {
        let connection = get_test_db_connection();

        let result = get_user_by_username("nobody", &connection);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn update_user_password_replaces_hash() {
        let connection = get_test_db_connection();
        let user =
            create_user("alice", PasswordHash::new_unchecked("hunter2"), &connection).unwrap();
        let new_hash = PasswordHash::new_unchecked("hunter3");

        update_user_password(user.id, new_hash.clone(), &connection).unwrap();

        let retrieved_user = get_user_by_id(user.id, &connection).unwrap();
        assert_eq!(retrieved_user.password_hash, new_hash);
    }

    #[test]
    fn update_user_password_fails_with_non_existent_id() {
        let connection = get_test_db_connection();

        let result = update_user_password(
            UserID::new(42),
            PasswordHash::new_unchecked("hunter3"),
            &connection,
        );

        assert_eq!(result, Err(Error::NotFound));
    }
}
