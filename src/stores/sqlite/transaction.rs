//! Implements a SQLite backed transaction store.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    Error,
    stores::{TransactionStore, UpsertOutcome, sqlite::lock_connection},
    transaction::{
        NewTransaction, TransactionRecord, count_transactions, get_all_transactions,
        get_transactions_for_user, insert_transaction_if_absent, transaction_exists,
    },
    user::UserID,
};

/// Stores transactions in a SQLite database.
///
/// The `external_id` column has a unique constraint and inserts use
/// `ON CONFLICT DO NOTHING`, so concurrent upserts of the same transaction
/// store it once.
#[derive(Debug, Clone)]
pub struct SQLiteTransactionStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteTransactionStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

impl TransactionStore for SQLiteTransactionStore {
    fn exists_by_external_id(&self, external_id: &str) -> Result<bool, Error> {
        let connection = lock_connection(&self.connection)?;

        transaction_exists(external_id, &connection)
    }

    /// Insert `transaction` if its external ID is not already stored.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::InvalidUser] if the owner does not refer to a valid user,
    /// - [Error::DatabaseLockError] if the connection lock is poisoned,
    /// - or [Error::SqlError] if there is some other SQL error.
    fn upsert(&self, transaction: &NewTransaction) -> Result<UpsertOutcome, Error> {
        let connection = lock_connection(&self.connection)?;

        match insert_transaction_if_absent(transaction, &connection)? {
            true => Ok(UpsertOutcome::Inserted),
            false => {
                tracing::debug!(
                    "transaction {} is already stored, skipping",
                    transaction.external_id
                );
                Ok(UpsertOutcome::AlreadyPresent)
            }
        }
    }

    fn find_all_for_user(&self, user_id: UserID) -> Result<Vec<TransactionRecord>, Error> {
        let connection = lock_connection(&self.connection)?;

        get_transactions_for_user(user_id, &connection)
    }

    fn list_all(&self) -> Result<Vec<TransactionRecord>, Error> {
        let connection = lock_connection(&self.connection)?;

        get_all_transactions(&connection)
    }

    fn count(&self) -> Result<u32, Error> {
        let connection = lock_connection(&self.connection)?;

        count_transactions(&connection)
    }
}
