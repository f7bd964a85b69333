//! Code for creating the cursor table and reading and writing the sync cursor
//! checkpoints in it.

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::Error;

/// The last cursor acknowledged for a provider session.
///
/// There is at most one checkpoint per session key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorCheckpoint {
    /// The session the cursor belongs to, see
    /// [ProviderCredential::session_key](crate::ProviderCredential::session_key).
    pub session_key: String,
    /// The cursor to resume from. `None` means the start of the history.
    pub continuation_token: Option<String>,
}

/// Create the cursor table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_cursor_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS provider_cursor (
                id INTEGER PRIMARY KEY,
                session_key TEXT NOT NULL UNIQUE,
                continuation_token TEXT
                )",
        (),
    )?;

    Ok(())
}

/// Get the checkpoint for `session_key`, if one has been saved.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn get_checkpoint(
    session_key: &str,
    connection: &Connection,
) -> Result<Option<CursorCheckpoint>, Error> {
    connection
        .prepare_cached(
            "SELECT session_key, continuation_token FROM provider_cursor WHERE session_key = ?1",
        )?
        .query_row((session_key,), |row| {
            Ok(CursorCheckpoint {
                session_key: row.get(0)?,
                continuation_token: row.get(1)?,
            })
        })
        .optional()
        .map_err(|error| error.into())
}

/// Create or update the checkpoint for `session_key`.
///
/// This is a single statement, so readers see either the old or the new
/// cursor, never a partial write.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn upsert_checkpoint(
    session_key: &str,
    continuation_token: Option<&str>,
    connection: &Connection,
) -> Result<(), Error> {
    connection
        .prepare_cached(
            "INSERT INTO provider_cursor (session_key, continuation_token) VALUES (?1, ?2)
             ON CONFLICT(session_key) DO UPDATE SET continuation_token = excluded.continuation_token",
        )?
        .execute((session_key, continuation_token))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::{
        cursor::{CursorCheckpoint, get_checkpoint, upsert_checkpoint},
        db::initialize,
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn missing_checkpoint_is_none() {
        let conn = get_test_connection();

        assert_eq!(get_checkpoint("session", &conn), Ok(None));
    }

    #[test]
    fn upsert_creates_then_updates() {
        let conn = get_test_connection();

        upsert_checkpoint("session", Some("c1"), &conn).unwrap();
        upsert_checkpoint("session", Some("c2"), &conn).unwrap();

        assert_eq!(
            get_checkpoint("session", &conn),
            Ok(Some(CursorCheckpoint {
                session_key: "session".to_owned(),
                continuation_token: Some("c2".to_owned()),
            }))
        );
        let row_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM provider_cursor", [], |row| row.get(0))
            .unwrap();
        assert_eq!(row_count, 1);
    }

    #[test]
    fn null_token_is_stored_as_start_of_history() {
        let conn = get_test_connection();

        upsert_checkpoint("session", None, &conn).unwrap();

        let checkpoint = get_checkpoint("session", &conn).unwrap().unwrap();
        assert_eq!(checkpoint.continuation_token, None);
    }

    #[test]
    fn sessions_are_independent() {
        let conn = get_test_connection();

        upsert_checkpoint("a", Some("a1"), &conn).unwrap();
        upsert_checkpoint("b", Some("b1"), &conn).unwrap();

        let a = get_checkpoint("a", &conn).unwrap().unwrap();
        let b = get_checkpoint("b", &conn).unwrap().unwrap();
        assert_eq!(a.continuation_token.as_deref(), Some("a1"));
        assert_eq!(b.continuation_token.as_deref(), Some("b1"));
    }
}
