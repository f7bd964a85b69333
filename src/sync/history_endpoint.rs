//! Route handler for loading transaction history straight from the provider.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Query, State},
};
use rusqlite::Connection;
use serde::Deserialize;
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error,
    provider::{DateRange, parse_date},
    sync::{Backfill, BackfillResult, credential_for_user},
    user::UserID,
};

/// The state needed for loading transaction history.
#[derive(Clone)]
pub struct HistoryState {
    /// The database connection, used to look up the caller's credential.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Pages through the provider's history.
    pub backfill: Backfill,
}

impl FromRef<AppState> for HistoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            backfill: state.backfill.clone(),
        }
    }
}

/// Query parameters for loading transaction history.
///
/// Dates are `YYYY-MM-DD`. A missing start date defaults to two years ago and
/// a missing end date defaults to today (UTC).
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    /// The first day to load, inclusive.
    pub start_date: Option<String>,
    /// The last day to load, inclusive.
    pub end_date: Option<String>,
}

impl HistoryParams {
    /// Resolve the requested dates, filling in defaults relative to `today`.
    fn date_range(&self, today: Date) -> Result<DateRange, Error> {
        let default_range = DateRange::last_two_years(today);

        let start = match &self.start_date {
            Some(text) => parse_date(text)?,
            None => default_range.start(),
        };
        let end = match &self.end_date {
            Some(text) => parse_date(text)?,
            None => default_range.end(),
        };

        DateRange::new(start, end)
    }
}

/// Route handler that loads the logged in user's transaction history straight
/// from the provider.
///
/// The transactions are returned as the provider sent them and are not
/// stored.
pub async fn get_transaction_history_endpoint(
    State(state): State<HistoryState>,
    Extension(user_id): Extension<UserID>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<BackfillResult>, Error> {
    let date_range = params.date_range(OffsetDateTime::now_utc().date())?;
    let credential = credential_for_user(user_id, &state.db_connection)?;

    state
        .backfill
        .fetch_all(&credential, &date_range)
        .await
        .map(Json)
}
