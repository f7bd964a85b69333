//! Caddie Sync is the backend of a personal finance app that keeps a local copy
//! of a user's bank transactions in step with a financial data provider.
//!
//! The interesting part is the [sync] module, which pulls transactions from the
//! provider page by page with an opaque cursor, stores each transaction exactly
//! once, and checkpoints the cursor so an interrupted sync resumes where it
//! left off.
//!
//! This library provides a JSON REST API for triggering syncs and reading the
//! stored transactions.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde::Serialize;
use time::Date;
use tokio::signal;

mod app_state;
mod auth;
mod cursor;
mod db;
mod endpoints;
mod logging;
mod provider;
mod routing;
mod stores;
mod sync;
mod transaction;
mod user;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use auth::{AuthState, COOKIE_TOKEN, DEFAULT_COOKIE_DURATION, auth_guard, set_auth_cookie};
pub use cursor::CursorCheckpoint;
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use provider::{
    DateRange, OffsetPage, PersonalFinanceCategory, PlaidClient, ProviderConfig,
    ProviderCredential, ProviderError, RawTransaction, SyncPage, TransactionProvider,
};
pub use routing::build_router;
pub use stores::{
    CursorStore, SQLiteCursorStore, SQLiteTransactionStore, TransactionStore, UpsertOutcome,
};
pub use sync::{
    Backfill, BackfillConfig, BackfillResult, DEFAULT_MAX_RECORDS, MAX_PAGE_SIZE,
    SQLSyncOrchestrator, SessionLocks, SyncFailure, SyncOrchestrator, SyncOutcome, SyncPhase,
    SyncResponse,
};
pub use transaction::{NewTransaction, TransactionRecord};
pub use user::{User, UserID, get_or_create_user, get_provider_credential, set_provider_credential};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The provider could not be reached, returned a non-success status, or
    /// returned a body that could not be parsed.
    ///
    /// The caller may retry. A retried sync resumes from the last checkpoint.
    #[error("provider request failed: {0}")]
    Provider(#[from] ProviderError),

    /// A transaction returned by the provider could not be mapped to a
    /// [TransactionRecord], e.g. because its date could not be parsed.
    #[error("transaction \"{external_id}\" from the provider is invalid: {reason}")]
    RecordFormat {
        /// The provider's ID for the offending transaction.
        external_id: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The user has not linked a provider credential, so there is nothing to
    /// sync with.
    #[error("no provider credential is linked for this user")]
    CredentialMissing,

    /// The caller's deadline passed before the provider reported that there
    /// was no more data.
    ///
    /// The cursor is left at the last completed page, so syncing again is safe.
    #[error("the sync deadline passed before all pages were fetched")]
    DeadlineExceeded,

    /// A historical load would return more transactions than the configured
    /// limit.
    #[error("the provider reported more than {0} transactions for the date range")]
    BackfillLimitExceeded(usize),

    /// A date string could not be parsed as `YYYY-MM-DD`.
    #[error("could not parse \"{0}\" as a date, expected YYYY-MM-DD")]
    InvalidDate(String),

    /// The end of a date range is before its start.
    #[error("the end date {end} is before the start date {start}")]
    InvalidDateRange {
        /// The first day of the range.
        start: Date,
        /// The last day of the range.
        end: Date,
    },

    /// The auth cookie is missing from the request.
    #[error("no auth cookie in the cookie jar")]
    CookieMissing,

    /// The auth cookie could not be decoded or has expired.
    #[error("the auth token is invalid or has expired")]
    InvalidToken,

    /// The owner of a transaction does not refer to a valid user.
    #[error("the user ID does not refer to a valid user")]
    InvalidUser,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    /// The HTTP status code that best describes the error to a client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Provider(_) | Error::RecordFormat { .. } => StatusCode::BAD_GATEWAY,
            Error::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            Error::CredentialMissing | Error::InvalidDate(_) | Error::InvalidDateRange { .. } => {
                StatusCode::BAD_REQUEST
            }
            Error::BackfillLimitExceeded(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::CookieMissing | Error::InvalidToken => StatusCode::UNAUTHORIZED,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::InvalidUser
            | Error::SqlError(_)
            | Error::DatabaseLockError
            | Error::JSONSerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message that is safe to show to a client.
    ///
    /// Internal errors are replaced with a general message and should be
    /// logged on the server instead.
    pub fn client_message(&self) -> String {
        match self.status_code() {
            StatusCode::INTERNAL_SERVER_ERROR => {
                "An unexpected error occurred, check the server logs for more details.".to_owned()
            }
            _ => self.to_string(),
        }
    }
}

/// The JSON body sent to clients when a request fails.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("An unexpected error occurred: {}", self);
        }

        (
            status,
            Json(ErrorBody {
                error: self.client_message(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::{Error, ProviderError};

    #[test]
    fn provider_errors_are_bad_gateway() {
        let error = Error::Provider(ProviderError::Status {
            status: 500,
            body: "oops".to_owned(),
        });

        assert_eq!(error.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn missing_credential_is_bad_request() {
        let response = Error::CredentialMissing.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_errors_hide_details() {
        let error = Error::SqlError(rusqlite::Error::InvalidQuery);

        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!error.client_message().contains("SQL"));
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
    }
}
