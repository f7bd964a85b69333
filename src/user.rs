//! Code for creating the user table and reading the provider credential linked
//! to a user.
//!
//! Registering and logging in users is handled by the session service, this
//! crate only needs to know who the user is and which provider credential
//! belongs to them.

use std::fmt::Display;

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::{Error, provider::ProviderCredential};

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

/// A user of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The name the user logs in with.
    pub username: String,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE COLLATE NOCASE,
                provider_access_token TEXT
                )",
        (),
    )?;

    Ok(())
}

/// Get the user called `username`, creating them if they do not exist yet.
///
/// Usernames are compared case-insensitively.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn get_or_create_user(username: &str, connection: &Connection) -> Result<User, Error> {
    connection.execute(
        "INSERT INTO user (username) VALUES (?1) ON CONFLICT(username) DO NOTHING",
        (username,),
    )?;

    connection
        .prepare("SELECT id, username FROM user WHERE username = ?1")?
        .query_row((username,), |row| {
            Ok(User {
                id: UserID::new(row.get(0)?),
                username: row.get(1)?,
            })
        })
        .map_err(|error| error.into())
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an:
/// - [Error::NotFound] if `user_id` does not belong to a registered user,
/// - [Error::SqlError] if there was an error trying to access the store.
#[cfg(test)]
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, username FROM user WHERE id = :id")?
        .query_row(&[(":id", &user_id.as_i64())], |row| {
            Ok(User {
                id: UserID::new(row.get(0)?),
                username: row.get(1)?,
            })
        })
        .map_err(|error| error.into())
}

/// Link a provider credential to a user, replacing any existing credential.
///
/// Pass `None` to unlink the user's credential.
///
/// # Errors
///
/// This function will return an:
/// - [Error::NotFound] if `user_id` does not belong to a registered user,
/// - [Error::SqlError] if there was an error trying to access the store.
pub fn set_provider_credential(
    user_id: UserID,
    credential: Option<&ProviderCredential>,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET provider_access_token = ?1 WHERE id = ?2",
        (
            credential.map(|credential| credential.expose()),
            user_id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Get the provider credential linked to a user.
///
/// # Errors
///
/// This function will return an:
/// - [Error::NotFound] if `user_id` does not belong to a registered user,
/// - [Error::CredentialMissing] if the user has not linked a credential,
/// - [Error::SqlError] if there was an error trying to access the store.
pub fn get_provider_credential(
    user_id: UserID,
    connection: &Connection,
) -> Result<ProviderCredential, Error> {
    let access_token: Option<String> = connection
        .prepare("SELECT provider_access_token FROM user WHERE id = :id")?
        .query_row(&[(":id", &user_id.as_i64())], |row| row.get(0))
        .optional()?
        .ok_or(Error::NotFound)?;

    match access_token {
        Some(access_token) => ProviderCredential::new(&access_token),
        None => Err(Error::CredentialMissing),
    }
}
