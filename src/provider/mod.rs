//! The client for the financial data provider that supplies bank transactions.
//!
//! The provider exposes two ways of paging through a user's transactions:
//! - cursor mode (`/transactions/sync`), where each page hands back an opaque
//!   cursor for the next page and a `has_more` flag,
//! - offset mode (`/transactions/get`), where pages are addressed with an
//!   offset and count and the first page reports the total.
//!
//! [TransactionProvider] is the seam the sync and backfill code depend on.
//! [PlaidClient] is the HTTP implementation.

mod client;
mod credential;
mod types;

pub use client::{PlaidClient, ProviderConfig};
pub use credential::ProviderCredential;
pub use types::{
    DATE_FORMAT, DateRange, OffsetPage, PersonalFinanceCategory, ProviderError, RawTransaction,
    SyncPage, format_date, parse_date,
};

use async_trait::async_trait;

/// Fetches pages of transactions from the provider.
///
/// Implementations do not retry. Retrying is left to the caller, who can
/// resume from the last checkpoint.
#[async_trait]
pub trait TransactionProvider: Send + Sync {
    /// Fetch the page of changes that follows `cursor`.
    ///
    /// A `cursor` of `None` starts from the beginning of the user's history.
    async fn fetch_sync_page(
        &self,
        credential: &ProviderCredential,
        cursor: Option<&str>,
    ) -> Result<SyncPage, ProviderError>;

    /// Fetch up to `count` transactions in `date_range`, skipping the first
    /// `offset`.
    async fn fetch_offset_page(
        &self,
        credential: &ProviderCredential,
        date_range: &DateRange,
        offset: usize,
        count: usize,
    ) -> Result<OffsetPage, ProviderError>;
}
