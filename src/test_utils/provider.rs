use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::provider::{
    DateRange, OffsetPage, ProviderCredential, ProviderError, RawTransaction, SyncPage,
    TransactionProvider,
};

pub(crate) fn raw_transaction(id: &str) -> RawTransaction {
    RawTransaction::new(id, 10.0, "2025-01-15", &format!("Transaction {id}"))
}

pub(crate) fn sync_page(ids: &[&str], next_cursor: &str, has_more: bool) -> SyncPage {
    SyncPage {
        added: ids.iter().map(|id| raw_transaction(id)).collect(),
        has_more,
        next_cursor: Some(next_cursor.to_owned()),
    }
}

/// A provider that serves scripted pages.
///
/// Cursor mode pages are keyed by the cursor they are requested with, so a
/// resumed sync gets the same pages a real provider would give it. Requesting
/// a cursor with no page is answered with a 400 error, like the real provider
/// does for an invalid cursor.
#[derive(Default)]
pub(crate) struct FakeProvider {
    sync_pages: Mutex<HashMap<Option<String>, SyncPage>>,
    failures: Mutex<HashMap<Option<String>, ProviderError>>,
    offset_transactions: Vec<RawTransaction>,
    delay: Option<Duration>,
    sync_calls: Mutex<Vec<Option<String>>>,
    offset_calls: Mutex<Vec<(usize, usize)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_page(self, cursor: Option<&str>, page: SyncPage) -> Self {
        self.add_page(cursor, page);
        self
    }

    /// Fail the next request for `cursor` with `error`, later requests succeed.
    pub(crate) fn with_failure_once(self, cursor: Option<&str>, error: ProviderError) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(cursor.map(str::to_owned), error);
        self
    }

    pub(crate) fn with_offset_transactions(mut self, transactions: Vec<RawTransaction>) -> Self {
        self.offset_transactions = transactions;
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn add_page(&self, cursor: Option<&str>, page: SyncPage) {
        self.sync_pages
            .lock()
            .unwrap()
            .insert(cursor.map(str::to_owned), page);
    }

    pub(crate) fn sync_calls(&self) -> Vec<Option<String>> {
        self.sync_calls.lock().unwrap().clone()
    }

    pub(crate) fn offset_calls(&self) -> Vec<(usize, usize)> {
        self.offset_calls.lock().unwrap().clone()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransactionProvider for FakeProvider {
    async fn fetch_sync_page(
        &self,
        _credential: &ProviderCredential,
        cursor: Option<&str>,
    ) -> Result<SyncPage, ProviderError> {
        let cursor = cursor.map(str::to_owned);
        self.sync_calls.lock().unwrap().push(cursor.clone());
        self.simulate_latency().await;

        if let Some(error) = self.failures.lock().unwrap().remove(&cursor) {
            return Err(error);
        }

        self.sync_pages
            .lock()
            .unwrap()
            .get(&cursor)
            .cloned()
            .ok_or_else(|| ProviderError::Status {
                status: 400,
                body: r#"{"error_code":"INVALID_CURSOR"}"#.to_owned(),
            })
    }

    async fn fetch_offset_page(
        &self,
        _credential: &ProviderCredential,
        _date_range: &DateRange,
        offset: usize,
        count: usize,
    ) -> Result<OffsetPage, ProviderError> {
        self.offset_calls.lock().unwrap().push((offset, count));
        self.simulate_latency().await;

        let transactions = self
            .offset_transactions
            .iter()
            .skip(offset)
            .take(count)
            .cloned()
            .collect();

        Ok(OffsetPage {
            transactions,
            total_transactions: self.offset_transactions.len(),
        })
    }
}
