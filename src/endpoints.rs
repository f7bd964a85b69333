//! The API endpoints URIs.

/// The route to request a cup of coffee (experimental).
pub const COFFEE: &str = "/api/coffee";
/// The route to list the logged in user's synced transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to list every synced transaction.
pub const ALL_TRANSACTIONS: &str = "/api/transactions/all";
/// The route to sync the logged in user's transactions from the provider.
pub const SYNC_TRANSACTIONS: &str = "/api/transactions/sync";
/// The route to load the logged in user's transaction history from the
/// provider without storing it.
pub const TRANSACTION_HISTORY: &str = "/api/transactions/history";
