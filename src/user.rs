//! Code for creating the user table and fetching users from the database.

use std::fmt::Display;

use email_address::EmailAddress;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A registered user of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The email address the user signs in with. Unique across users.
    pub email: EmailAddress,
    /// The name the user is greeted by.
    pub name: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                password TEXT NOT NULL
                )",
        (),
    )?;

    // Ensure the sequence starts at 1
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('user', 0)",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// # Errors
///
/// This function will return a:
/// - [Error::DuplicateEmail] if `email` is already registered,
/// - [Error::SqlError] if an SQL related error occurred.
pub fn create_user(
    email: EmailAddress,
    name: &str,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<User, Error> {
    connection.execute(
        "INSERT INTO user (email, name, password) VALUES (?1, ?2, ?3)",
        (&email.to_string(), name, password_hash.as_ref()),
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        email,
        name: name.to_string(),
        password_hash,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the database.
pub fn get_user_by_id(user_id: UserID, db_connection: &Connection) -> Result<User, Error> {
    db_connection
        .prepare("SELECT id, email, name, password FROM user WHERE id = :id")?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get the user from the database with an email address equal to `email`.
///
/// # Errors
///
/// This function will return an error if:
/// - `email` does not belong to a registered user.
/// - there was an error trying to access the database.
pub fn get_user_by_email(email: &EmailAddress, db_connection: &Connection) -> Result<User, Error> {
    db_connection
        .prepare("SELECT id, email, name, password FROM user WHERE email = :email")?
        .query_row(&[(":email", &email.to_string())], map_user_row)
        .map_err(|error| error.into())
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_id = row.get(0)?;
    let raw_email: String = row.get(1)?;
    let name = row.get(2)?;
    let raw_password_hash: String = row.get(3)?;

    let id = UserID::new(raw_id);
    let email = EmailAddress::new_unchecked(raw_email);
    let password_hash = PasswordHash::new_unchecked(&raw_password_hash);

    Ok(User {
        id,
        email,
        name,
        password_hash,
    })
}

#[cfg(test)]
mod user_tests {
    use std::str::FromStr;

    use email_address::EmailAddress;
    use rusqlite::Connection;

    use crate::{
        PasswordHash,
        user::{UserID, create_user, get_user_by_email, get_user_by_id},
    };

    use super::{Error, create_user_table};

    fn get_db_connection() -> Connection {
        let conn =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        create_user_table(&conn).expect("Could not create user table");

        conn
    }

    fn test_email() -> EmailAddress {
        EmailAddress::from_str("hello@world.com").unwrap()
    }

    #[test]
    fn insert_user_succeeds() {
        let db_connection = get_db_connection();
        let password_hash = PasswordHash::new_unchecked("hunter2");

        let inserted_user =
            create_user(test_email(), "Ada", password_hash.clone(), &db_connection).unwrap();

        assert!(inserted_user.id.as_i64() > 0);
        assert_eq!(inserted_user.email, test_email());
        assert_eq!(inserted_user.name, "Ada");
        assert_eq!(inserted_user.password_hash, password_hash);
    }

    #[test]
    fn insert_user_fails_on_duplicate_email() {
        let db_connection = get_db_connection();

        create_user(
            test_email(),
            "Ada",
            PasswordHash::new_unchecked("hunter2"),
            &db_connection,
        )
        .expect("Could not insert first user");

        let result = create_user(
            test_email(),
            "Grace",
            PasswordHash::new_unchecked("hunter3"),
            &db_connection,
        );

        assert_eq!(result, Err(Error::DuplicateEmail));
    }

    #[test]
    fn get_user_fails_with_non_existent_id() {
        let db_connection = get_db_connection();

        let id = UserID::new(42);

        assert_eq!(get_user_by_id(id, &db_connection), Err(Error::NotFound));
    }

    #[test]
    fn get_user_succeeds_with_existing_id() {
        let db_connection = get_db_connection();
        let test_user = create_user(
            test_email(),
            "Ada",
            PasswordHash::new_unchecked("hunter2"),
            &db_connection,
        )
        .unwrap();

        let retrieved_user = get_user_by_id(test_user.id, &db_connection).unwrap();

        assert_eq!(retrieved_user, test_user);
    }

    #[test]
    fn get_user_by_email_fails_with_unregistered_email() {
        let db_connection = get_db_connection();

        let email = EmailAddress::from_str("nobody@nowhere.net").unwrap();

        assert_eq!(
            get_user_by_email(&email, &db_connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn get_user_by_email_succeeds_with_existing_email() {
        let db_connection = get_db_connection();
        let test_user = create_user(
            test_email(),
            "Ada",
            PasswordHash::new_unchecked("hunter2"),
            &db_connection,
        )
        .unwrap();

        let retrieved_user = get_user_by_email(&test_user.email, &db_connection).unwrap();

        assert_eq!(retrieved_user, test_user);
    }
}
