//! Route handlers for listing stored transactions.

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};

use crate::{
    AppState, Error,
    stores::{SQLiteTransactionStore, TransactionStore},
    transaction::TransactionRecord,
    user::UserID,
};

/// The state needed for listing transactions.
#[derive(Debug, Clone)]
pub struct TransactionListState {
    /// The store the synced transactions live in.
    pub transaction_store: SQLiteTransactionStore,
}

impl FromRef<AppState> for TransactionListState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            transaction_store: SQLiteTransactionStore::new(state.db_connection.clone()),
        }
    }
}

/// Route handler that returns the logged in user's synced transactions as JSON.
pub async fn get_transactions_endpoint(
    State(state): State<TransactionListState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<TransactionRecord>>, Error> {
    state
        .transaction_store
        .find_all_for_user(user_id)
        .map(Json)
        .inspect_err(|error| tracing::error!("could not get transactions for {user_id}: {error}"))
}

/// Route handler that returns every stored transaction as JSON.
pub async fn get_all_transactions_endpoint(
    State(state): State<TransactionListState>,
) -> Result<Json<Vec<TransactionRecord>>, Error> {
    state
        .transaction_store
        .list_all()
        .map(Json)
        .inspect_err(|error| tracing::error!("could not get all transactions: {error}"))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State};
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        db::initialize,
        stores::SQLiteTransactionStore,
        transaction::{
            NewTransaction, TransactionListState, get_all_transactions_endpoint,
            get_transactions_endpoint, insert_transaction_if_absent,
        },
        user::{UserID, get_or_create_user},
    };

    fn new_transaction(external_id: &str, owner_user_id: UserID) -> NewTransaction {
        NewTransaction {
            external_id: external_id.to_owned(),
            account_id: "acc1".to_owned(),
            amount: -3.5,
            description: "Bus".to_owned(),
            category: Some("TRANSPORTATION".to_owned()),
            subcategory: None,
            occurred_on: date!(2025 - 03 - 01),
            currency_code: None,
            merchant_name: None,
            owner_user_id: Some(owner_user_id),
        }
    }

    fn get_test_state() -> (TransactionListState, UserID, UserID) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let alice = get_or_create_user("alice", &conn).unwrap().id;
        let bob = get_or_create_user("bob", &conn).unwrap().id;
        insert_transaction_if_absent(&new_transaction("t1", alice), &conn).unwrap();
        insert_transaction_if_absent(&new_transaction("t2", bob), &conn).unwrap();

        let state = TransactionListState {
            transaction_store: SQLiteTransactionStore::new(Arc::new(Mutex::new(conn))),
        };

        (state, alice, bob)
    }

    #[tokio::test]
    async fn returns_only_the_callers_transactions() {
        let (state, alice, _) = get_test_state();

        let transactions = get_transactions_endpoint(State(state), Extension(alice))
            .await
            .unwrap()
            .0;

        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].external_id, "t1");
    }

    #[tokio::test]
    async fn all_returns_every_transaction() {
        let (state, _, _) = get_test_state();

        let transactions = get_all_transactions_endpoint(State(state)).await.unwrap().0;

        assert_eq!(transactions.len(), 2);
    }
}
