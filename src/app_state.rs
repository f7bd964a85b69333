//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};

use crate::{
    Error,
    db::initialize,
    provider::TransactionProvider,
    stores::{SQLiteCursorStore, SQLiteTransactionStore},
    sync::{Backfill, BackfillConfig, SQLSyncOrchestrator, SyncOrchestrator},
};

/// The state of the REST server.
#[derive(Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,

    /// Runs cursor mode syncs into the database.
    pub sync_orchestrator: SQLSyncOrchestrator,

    /// Loads transaction history in offset mode.
    pub backfill: Backfill,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the
    /// domain models. `cookie_secret` must be the secret shared with the
    /// session service that issues the auth cookies.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        cookie_secret: &str,
        provider: Arc<dyn TransactionProvider>,
        backfill_config: BackfillConfig,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        let connection = Arc::new(Mutex::new(db_connection));
        let sync_orchestrator = SyncOrchestrator::new(
            provider.clone(),
            SQLiteTransactionStore::new(connection.clone()),
            SQLiteCursorStore::new(connection.clone()),
        );

        Ok(Self {
            cookie_key: create_cookie_key(cookie_secret),
            db_connection: connection,
            sync_orchestrator,
            backfill: Backfill::new(provider, backfill_config),
        })
    }
}

/// Create a signing key for cookies from a `secret`s string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}
