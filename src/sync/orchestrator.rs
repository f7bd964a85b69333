//! Pulls new transactions from the provider in cursor mode and checkpoints
//! the cursor after every page.

use std::{fmt::Display, sync::Arc};

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tokio::time::Instant;

use crate::{
    Error,
    provider::{ProviderCredential, ProviderError, SyncPage, TransactionProvider},
    stores::{
        CursorStore, SQLiteCursorStore, SQLiteTransactionStore, TransactionStore, UpsertOutcome,
    },
    sync::SessionLocks,
    transaction::NewTransaction,
    user::UserID,
};

/// The steps of a sync pass.
///
/// A pass moves `Idle → Fetching → Persisting → Checkpointing` and then either
/// back to `Fetching` for the next page or on to `Done`. Any error moves it to
/// `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// Waiting for the session lock and loading the checkpoint.
    Idle,
    /// Waiting on the provider for a page.
    Fetching,
    /// Storing the transactions on a page.
    Persisting,
    /// Saving the cursor that follows a stored page.
    Checkpointing,
    /// The provider has no more pages.
    Done,
    /// The pass stopped because of an error.
    Failed,
}

impl Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Fetching => "fetching",
            SyncPhase::Persisting => "persisting",
            SyncPhase::Checkpointing => "checkpointing",
            SyncPhase::Done => "done",
            SyncPhase::Failed => "failed",
        };

        write!(f, "{name}")
    }
}

/// The result of a sync pass that ran until the provider had no more pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// How many transactions were stored for the first time.
    pub new_record_count: usize,
    /// How many pages were fetched.
    pub pages: usize,
    /// The cursor the next pass will resume from.
    pub cursor: Option<String>,
}

/// A sync pass that stopped early.
///
/// Transactions stored before the failure stay stored and the cursor stays at
/// the last page that was fully stored, so running the sync again picks up
/// where this pass stopped.
#[derive(Debug, PartialEq, thiserror::Error)]
#[error("sync failed while {failed_during} after storing {persisted} new transactions: {error}")]
pub struct SyncFailure {
    /// What went wrong.
    pub error: Error,
    /// The phase that was running when the error occurred.
    pub failed_during: SyncPhase,
    /// How many transactions were stored for the first time before the error.
    pub persisted: usize,
}

impl From<Error> for SyncFailure {
    /// A failure that happened before any page was fetched.
    fn from(error: Error) -> Self {
        Self {
            error,
            failed_during: SyncPhase::Idle,
            persisted: 0,
        }
    }
}

#[derive(Debug, Serialize)]
struct SyncFailureBody {
    error: String,
    new_record_count: usize,
}

impl IntoResponse for SyncFailure {
    fn into_response(self) -> Response {
        let status = self.error.status_code();

        if status.is_server_error() {
            tracing::error!("{self}");
        }

        (
            status,
            Json(SyncFailureBody {
                error: self.error.client_message(),
                new_record_count: self.persisted,
            }),
        )
            .into_response()
    }
}

/// The phase and counters of a pass that is in progress.
#[derive(Debug)]
struct SyncProgress {
    phase: SyncPhase,
    persisted: usize,
    pages: usize,
}

impl SyncProgress {
    fn new() -> Self {
        Self {
            phase: SyncPhase::Idle,
            persisted: 0,
            pages: 0,
        }
    }

    fn enter(&mut self, phase: SyncPhase) {
        tracing::trace!("sync phase {} -> {}", self.phase, phase);
        self.phase = phase;
    }
}

/// Keeps the local transaction store in step with the provider.
///
/// Each call to [SyncOrchestrator::sync] is a sync pass: it resumes from the
/// session's checkpoint, stores each new transaction once, saves the
/// provider's next cursor after every page, and stops when the provider says
/// there is nothing more.
#[derive(Clone)]
pub struct SyncOrchestrator<T, C> {
    provider: Arc<dyn TransactionProvider>,
    transaction_store: T,
    cursor_store: C,
    session_locks: SessionLocks,
}

/// A sync orchestrator that uses SQLite for both of its stores.
pub type SQLSyncOrchestrator = SyncOrchestrator<SQLiteTransactionStore, SQLiteCursorStore>;

impl<T, C> SyncOrchestrator<T, C>
where
    T: TransactionStore,
    C: CursorStore,
{
    /// Create an orchestrator that fetches from `provider` and writes to the
    /// given stores.
    pub fn new(
        provider: Arc<dyn TransactionProvider>,
        transaction_store: T,
        cursor_store: C,
    ) -> Self {
        Self {
            provider,
            transaction_store,
            cursor_store,
            session_locks: SessionLocks::new(),
        }
    }

    /// Run a sync pass for the session identified by `credential`.
    ///
    /// New transactions are stored with `owner` as their owner. Calls for the
    /// same credential wait for each other, calls for different credentials
    /// run at the same time.
    ///
    /// If `deadline` passes, the pass stops after the page it is working on
    /// has been checkpointed.
    ///
    /// # Errors
    /// Returns a [SyncFailure] holding:
    /// - [Error::Provider] if a page could not be fetched, or the provider
    ///   reported more pages without a cursor ([ProviderError::MissingCursor]),
    /// - [Error::RecordFormat] if a transaction could not be mapped,
    /// - [Error::DeadlineExceeded] if `deadline` passed between pages,
    /// - [Error::InvalidUser], [Error::SqlError] or [Error::DatabaseLockError]
    ///   if a store could not be read or written.
    pub async fn sync(
        &self,
        owner: Option<UserID>,
        credential: &ProviderCredential,
        deadline: Option<Instant>,
    ) -> Result<SyncOutcome, SyncFailure> {
        let session_key = credential.session_key();
        let _session_guard = self.session_locks.acquire(&session_key).await;
        let mut progress = SyncProgress::new();

        tracing::info!(
            "starting sync for session {}",
            short_session_key(&session_key)
        );

        match self
            .sync_pages(owner, credential, &session_key, deadline, &mut progress)
            .await
        {
            Ok(cursor) => {
                progress.enter(SyncPhase::Done);
                tracing::info!(
                    "finished sync for session {}: {} new transactions over {} pages",
                    short_session_key(&session_key),
                    progress.persisted,
                    progress.pages
                );

                Ok(SyncOutcome {
                    new_record_count: progress.persisted,
                    pages: progress.pages,
                    cursor,
                })
            }
            Err(error) => {
                let failed_during = progress.phase;
                progress.enter(SyncPhase::Failed);
                tracing::warn!(
                    "sync for session {} failed while {failed_during}: {error}",
                    short_session_key(&session_key)
                );

                Err(SyncFailure {
                    error,
                    failed_during,
                    persisted: progress.persisted,
                })
            }
        }
    }

    /// Fetch, store and checkpoint pages until the provider runs out.
    ///
    /// Returns the final cursor.
    async fn sync_pages(
        &self,
        owner: Option<UserID>,
        credential: &ProviderCredential,
        session_key: &str,
        deadline: Option<Instant>,
        progress: &mut SyncProgress,
    ) -> Result<Option<String>, Error> {
        let mut cursor = self.cursor_store.load_cursor(session_key)?;

        loop {
            progress.enter(SyncPhase::Fetching);
            let page = self
                .provider
                .fetch_sync_page(credential, cursor.as_deref())
                .await?;
            progress.pages += 1;
            tracing::debug!(
                "page {} has {} transactions, has_more={}",
                progress.pages,
                page.added.len(),
                page.has_more
            );

            progress.enter(SyncPhase::Persisting);
            self.persist_page(&page, owner, &mut progress.persisted)?;

            progress.enter(SyncPhase::Checkpointing);
            match page.next_cursor() {
                Some(next_cursor) => {
                    self.cursor_store.save_cursor(session_key, Some(next_cursor))?;
                    cursor = Some(next_cursor.to_owned());
                }
                None if page.has_more => return Err(ProviderError::MissingCursor.into()),
                // Nothing new to resume from, keep the previous position.
                None => self.cursor_store.save_cursor(session_key, cursor.as_deref())?,
            }

            if !page.has_more {
                return Ok(cursor);
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(Error::DeadlineExceeded);
            }
        }
    }

    /// Store the transactions on `page` that are not already stored.
    ///
    /// `persisted` is incremented for each stored transaction as it is stored,
    /// so the count is accurate even if a later transaction fails.
    fn persist_page(
        &self,
        page: &SyncPage,
        owner: Option<UserID>,
        persisted: &mut usize,
    ) -> Result<(), Error> {
        for raw in &page.added {
            if self
                .transaction_store
                .exists_by_external_id(raw.transaction_id.trim())?
            {
                continue;
            }

            let transaction = NewTransaction::from_raw(raw, owner)?;

            if self.transaction_store.upsert(&transaction)? == UpsertOutcome::Inserted {
                *persisted += 1;
            }
        }

        Ok(())
    }
}

/// A prefix of the session key that is enough to tell sessions apart in logs.
fn short_session_key(session_key: &str) -> &str {
    session_key.get(..8).unwrap_or(session_key)
}
