//! Implements a SQLite backed cursor store.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    Error,
    cursor::{get_checkpoint, upsert_checkpoint},
    stores::{CursorStore, sqlite::lock_connection},
};

/// Stores cursor checkpoints in a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLiteCursorStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteCursorStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

impl CursorStore for SQLiteCursorStore {
    fn load_cursor(&self, session_key: &str) -> Result<Option<String>, Error> {
        let connection = lock_connection(&self.connection)?;

        Ok(get_checkpoint(session_key, &connection)?
            .and_then(|checkpoint| checkpoint.continuation_token))
    }

    fn save_cursor(
        &self,
        session_key: &str,
        continuation_token: Option<&str>,
    ) -> Result<(), Error> {
        let connection = lock_connection(&self.connection)?;

        upsert_checkpoint(session_key, continuation_token, &connection)
    }
}
