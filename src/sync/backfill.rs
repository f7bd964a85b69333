//! Loads a user's transaction history from the provider in offset mode.

use std::sync::Arc;

use serde::Serialize;

use crate::{
    Error,
    provider::{DateRange, ProviderCredential, RawTransaction, TransactionProvider},
};

/// The largest page the provider will return in offset mode.
pub const MAX_PAGE_SIZE: usize = 500;

/// The default cap on how many transactions a single load may return.
pub const DEFAULT_MAX_RECORDS: usize = 50_000;

/// Settings for historical loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillConfig {
    /// How many transactions to request per page, at most [MAX_PAGE_SIZE].
    pub page_size: usize,
    /// Fail instead of loading a date range with more transactions than this.
    ///
    /// `None` disables the check.
    pub max_records: Option<usize>,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            max_records: Some(DEFAULT_MAX_RECORDS),
        }
    }
}

/// Every transaction in a date range, as the provider sent them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackfillResult {
    /// The number of transactions the provider reported for the range.
    pub total_transactions: usize,
    /// The transactions, in the order the provider returned them.
    pub transactions: Vec<RawTransaction>,
}

/// Pages through a date range in offset mode.
///
/// Nothing is written to the stores, the transactions are handed back to the
/// caller untouched.
#[derive(Clone)]
pub struct Backfill {
    provider: Arc<dyn TransactionProvider>,
    config: BackfillConfig,
}

impl Backfill {
    /// Create a backfill that fetches from `provider`.
    pub fn new(provider: Arc<dyn TransactionProvider>, config: BackfillConfig) -> Self {
        Self { provider, config }
    }

    /// Fetch every page in `date_range` and pass each page's transactions to
    /// `on_page` as it arrives.
    ///
    /// Pages are requested until the offset reaches the total reported by the
    /// provider, or the provider returns an empty page.
    ///
    /// Returns the total number of transactions the provider reported.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::Provider] if a page could not be fetched,
    /// - [Error::BackfillLimitExceeded] if the provider reports more
    ///   transactions than the configured `max_records`,
    /// - or any error returned by `on_page`.
    pub async fn for_each_page<F>(
        &self,
        credential: &ProviderCredential,
        date_range: &DateRange,
        mut on_page: F,
    ) -> Result<usize, Error>
    where
        F: FnMut(Vec<RawTransaction>) -> Result<(), Error> + Send,
    {
        let page_size = self.config.page_size.clamp(1, MAX_PAGE_SIZE);
        let mut offset = 0;

        loop {
            let page = self
                .provider
                .fetch_offset_page(credential, date_range, offset, page_size)
                .await?;
            let total = page.total_transactions;

            if let Some(max_records) = self.config.max_records {
                if total > max_records {
                    tracing::warn!(
                        "refusing to load {total} transactions, the limit is {max_records}"
                    );
                    return Err(Error::BackfillLimitExceeded(max_records));
                }
            }

            let received = page.transactions.len();
            offset += received;
            tracing::debug!("received {received} transactions, {offset} of {total}");

            on_page(page.transactions)?;

            if received == 0 || offset >= total {
                return Ok(total);
            }
        }
    }

    /// Fetch every transaction in `date_range`.
    ///
    /// # Errors
    /// See [Backfill::for_each_page].
    pub async fn fetch_all(
        &self,
        credential: &ProviderCredential,
        date_range: &DateRange,
    ) -> Result<BackfillResult, Error> {
        let mut transactions = Vec::new();

        let total_transactions = self
            .for_each_page(credential, date_range, |page| {
                transactions.extend(page);
                Ok(())
            })
            .await?;

        tracing::info!(
            "loaded {} transactions from {} to {}",
            transactions.len(),
            date_range.start(),
            date_range.end()
        );

        Ok(BackfillResult {
            total_transactions,
            transactions,
        })
    }
}
