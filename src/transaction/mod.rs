//! Transactions synced from the provider.
//!
//! This module contains:
//! - The `TransactionRecord` model and `NewTransaction` for creating records
//! - Database functions for storing and querying transactions
//! - Route handlers for listing stored transactions

mod core;
mod get_transactions_endpoint;

pub use core::{
    DatabaseId, NewTransaction, TransactionRecord, count_transactions, create_transaction_table,
    get_all_transactions, get_transactions_for_user, insert_transaction_if_absent,
    transaction_exists,
};
pub use get_transactions_endpoint::{
    TransactionListState, get_all_transactions_endpoint, get_transactions_endpoint,
};
