//! Defines the transaction store trait.

use crate::{
    Error,
    transaction::{NewTransaction, TransactionRecord},
    user::UserID,
};

/// What happened when a transaction was upserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The transaction was new and has been stored.
    Inserted,
    /// A transaction with the same external ID was already stored, nothing
    /// was changed.
    AlreadyPresent,
}

/// Handles the storage and retrieval of transactions synced from the provider.
///
/// Implementers must guarantee that at most one transaction is stored per
/// external ID, even when two callers upsert the same ID at the same time.
pub trait TransactionStore {
    /// Check whether a transaction with `external_id` is stored.
    fn exists_by_external_id(&self, external_id: &str) -> Result<bool, Error>;

    /// Store `transaction` unless a transaction with the same external ID is
    /// already stored.
    ///
    /// Finding an existing transaction is not an error, and the existing
    /// transaction is left as is.
    fn upsert(&self, transaction: &NewTransaction) -> Result<UpsertOutcome, Error>;

    /// Retrieve the transactions synced for `user_id`.
    fn find_all_for_user(&self, user_id: UserID) -> Result<Vec<TransactionRecord>, Error>;

    /// Retrieve every stored transaction.
    fn list_all(&self) -> Result<Vec<TransactionRecord>, Error>;

    /// The number of stored transactions.
    fn count(&self) -> Result<u32, Error>;
}
