//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::{
    AppState, Error,
    auth::auth_guard,
    endpoints,
    sync::{get_transaction_history_endpoint, sync_transactions_endpoint},
    transaction::{get_all_transactions_endpoint, get_transactions_endpoint},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new().route(endpoints::COFFEE, get(get_coffee));

    let protected_routes = Router::new()
        .route(endpoints::TRANSACTIONS, get(get_transactions_endpoint))
        .route(
            endpoints::ALL_TRANSACTIONS,
            get(get_all_transactions_endpoint),
        )
        .route(
            endpoints::SYNC_TRANSACTIONS,
            post(sync_transactions_endpoint),
        )
        .route(
            endpoints::TRANSACTION_HISTORY,
            get(get_transaction_history_endpoint),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

/// Attempt to get a cup of coffee from the server.
async fn get_coffee() -> Response {
    (StatusCode::IM_A_TEAPOT, "I'm a teapot").into_response()
}

async fn get_404_not_found() -> Error {
    Error::NotFound
}
