//! Route handler for syncing the logged in user's transactions.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Extension, Json,
    extract::{FromRef, Query, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::{
    AppState,
    sync::{SQLSyncOrchestrator, SyncFailure, credential_for_user},
    user::UserID,
};

/// The state needed for triggering a sync.
#[derive(Clone)]
pub struct SyncState {
    /// The database connection, used to look up the caller's credential.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Runs the sync passes.
    pub orchestrator: SQLSyncOrchestrator,
}

impl FromRef<AppState> for SyncState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            orchestrator: state.sync_orchestrator.clone(),
        }
    }
}

/// Query parameters for triggering a sync.
#[derive(Debug, Default, Deserialize)]
pub struct SyncParams {
    /// Give up between pages once this many seconds have passed.
    pub timeout_secs: Option<u64>,
}

impl SyncParams {
    /// The instant to give up at, counting from `now`.
    ///
    /// A timeout too large to represent is treated as no deadline.
    fn deadline(&self, now: Instant) -> Option<Instant> {
        self.timeout_secs
            .and_then(|seconds| now.checked_add(Duration::from_secs(seconds)))
    }
}

/// The response body of a successful sync.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncResponse {
    /// How many transactions were stored for the first time.
    pub new_record_count: usize,
}

/// Route handler that syncs the logged in user's transactions from the
/// provider.
///
/// Fails fast with a 400 if the user has not linked a provider credential.
pub async fn sync_transactions_endpoint(
    State(state): State<SyncState>,
    Extension(user_id): Extension<UserID>,
    Query(params): Query<SyncParams>,
) -> Result<Json<SyncResponse>, SyncFailure> {
    let credential = credential_for_user(user_id, &state.db_connection)?;
    let deadline = params.deadline(Instant::now());

    let outcome = state
        .orchestrator
        .sync(Some(user_id), &credential, deadline)
        .await?;

    Ok(Json(SyncResponse {
        new_record_count: outcome.new_record_count,
    }))
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use axum::{
        Extension,
        extract::{Query, State},
    };
    use rusqlite::Connection;
    use tokio::time::Instant;

    use crate::{
        Error,
        provider::ProviderError,
        stores::{SQLiteCursorStore, SQLiteTransactionStore, TransactionStore},
        sync::{SyncOrchestrator, SyncParams, SyncPhase, SyncState, sync_transactions_endpoint},
        test_utils::{FakeProvider, get_test_connection, must_create_linked_user, sync_page},
        user::get_or_create_user,
    };

    fn get_test_state(provider: &Arc<FakeProvider>) -> (SyncState, Arc<Mutex<Connection>>) {
        let connection = get_test_connection();
        let state = SyncState {
            db_connection: connection.clone(),
            orchestrator: SyncOrchestrator::new(
                provider.clone(),
                SQLiteTransactionStore::new(connection.clone()),
                SQLiteCursorStore::new(connection.clone()),
            ),
        };

        (state, connection)
    }

    #[tokio::test]
    async fn sync_returns_new_record_count() {
        let provider = Arc::new(
            FakeProvider::new()
                .with_page(None, sync_page(&["t1", "t2"], "c1", false))
                .with_page(Some("c1"), sync_page(&[], "c1", false)),
        );
        let (state, connection) = get_test_state(&provider);
        let user = must_create_linked_user("alice", "access-sandbox-1", &connection);

        let first = sync_transactions_endpoint(
            State(state.clone()),
            Extension(user.id),
            Query(SyncParams::default()),
        )
        .await
        .unwrap();
        let second = sync_transactions_endpoint(
            State(state),
            Extension(user.id),
            Query(SyncParams::default()),
        )
        .await
        .unwrap();

        assert_eq!(first.new_record_count, 2);
        assert_eq!(second.new_record_count, 0);
        let stored = SQLiteTransactionStore::new(connection)
            .find_all_for_user(user.id)
            .unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[test]
    fn timeout_sets_deadline() {
        let now = Instant::now();
        let params = SyncParams {
            timeout_secs: Some(30),
        };

        assert_eq!(params.deadline(now), Some(now + Duration::from_secs(30)));
        assert_eq!(SyncParams::default().deadline(now), None);
    }

    #[tokio::test]
    async fn huge_timeout_syncs_without_deadline() {
        let provider = Arc::new(
            FakeProvider::new().with_page(None, sync_page(&["t1"], "c1", false)),
        );
        let (state, connection) = get_test_state(&provider);
        let user = must_create_linked_user("alice", "access-sandbox-1", &connection);

        let response = sync_transactions_endpoint(
            State(state),
            Extension(user.id),
            Query(SyncParams {
                timeout_secs: Some(u64::MAX),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.new_record_count, 1);
    }

    #[tokio::test]
    async fn missing_credential_fails_without_calling_provider() {
        let provider = Arc::new(FakeProvider::new());
        let (state, connection) = get_test_state(&provider);
        let user = get_or_create_user("bob", &connection.lock().unwrap()).unwrap();

        let failure = sync_transactions_endpoint(
            State(state),
            Extension(user.id),
            Query(SyncParams::default()),
        )
        .await
        .unwrap_err();

        assert_eq!(failure.error, Error::CredentialMissing);
        assert_eq!(failure.failed_during, SyncPhase::Idle);
        assert!(provider.sync_calls().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_reports_what_was_stored() {
        let error = ProviderError::Status {
            status: 503,
            body: "PRODUCT_NOT_READY".to_owned(),
        };
        let provider = Arc::new(
            FakeProvider::new()
                .with_page(None, sync_page(&["t1"], "c1", true))
                .with_failure_once(Some("c1"), error.clone()),
        );
        let (state, connection) = get_test_state(&provider);
        let user = must_create_linked_user("alice", "access-sandbox-1", &connection);

        let failure = sync_transactions_endpoint(
            State(state),
            Extension(user.id),
            Query(SyncParams::default()),
        )
        .await
        .unwrap_err();

        assert_eq!(failure.error, Error::Provider(error));
        assert_eq!(failure.persisted, 1);
    }
}
