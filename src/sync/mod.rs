//! Keeps the local transaction store in step with the provider.
//!
//! [SyncOrchestrator] runs cursor mode sync passes that store new
//! transactions and checkpoint the cursor. [Backfill] loads historical
//! transactions in offset mode without touching the stores.

mod backfill;
mod history_endpoint;
mod orchestrator;
mod session_lock;
mod sync_endpoint;

pub use backfill::{Backfill, BackfillConfig, BackfillResult, DEFAULT_MAX_RECORDS, MAX_PAGE_SIZE};
pub use history_endpoint::{HistoryParams, HistoryState, get_transaction_history_endpoint};
pub use orchestrator::{SQLSyncOrchestrator, SyncFailure, SyncOrchestrator, SyncOutcome, SyncPhase};
pub use session_lock::SessionLocks;
pub use sync_endpoint::{SyncParams, SyncResponse, SyncState, sync_transactions_endpoint};

use std::sync::Mutex;

use rusqlite::Connection;

use crate::{
    Error, provider::ProviderCredential, stores::sqlite::lock_connection,
    user::{UserID, get_provider_credential},
};

/// Look up the provider credential linked to `user_id`.
///
/// The connection lock is released before returning so that callers can
/// await the provider afterwards.
fn credential_for_user(
    user_id: UserID,
    connection: &Mutex<Connection>,
) -> Result<ProviderCredential, Error> {
    let connection = lock_connection(connection)?;

    get_provider_credential(user_id, &connection)
}
