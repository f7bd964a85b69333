//! SQLite backed implementations of the store traits.
//!
//! The stores share one connection behind a mutex. The mutex is held for a
//! single statement at a time and never across an `.await`.

mod cursor;
mod transaction;

pub use cursor::SQLiteCursorStore;
pub use transaction::SQLiteTransactionStore;

use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use crate::Error;

pub(crate) fn lock_connection(
    connection: &Mutex<Connection>,
) -> Result<MutexGuard<'_, Connection>, Error> {
    connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}
