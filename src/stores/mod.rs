//! Contains traits and implementations for objects that store the synced
//! transactions and the cursor checkpoints.

mod cursor;
mod transaction;

pub mod sqlite;

pub use cursor::CursorStore;
pub use sqlite::{SQLiteCursorStore, SQLiteTransactionStore};
pub use transaction::{TransactionStore, UpsertOutcome};
