//! HTTP client for the provider's transactions API.

use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Serialize, de::DeserializeOwned};

use crate::provider::{
    DateRange, OffsetPage, ProviderCredential, ProviderError, SyncPage, TransactionProvider,
    format_date,
};

/// How long to wait for the provider before giving up on a request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where the provider lives and the API keys for talking to it.
#[derive(Clone)]
pub struct ProviderConfig {
    /// The base URL of the API, e.g. "https://sandbox.plaid.com".
    pub base_url: String,
    /// The client ID issued to this app by the provider.
    pub client_id: String,
    /// The secret issued to this app by the provider.
    pub secret: String,
    /// The timeout for each request.
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Create a config with the [DEFAULT_TIMEOUT].
    pub fn new(base_url: &str, client_id: &str, secret: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            client_id: client_id.to_owned(),
            secret: secret.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("secret", &"********")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Serialize)]
struct SyncRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    access_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<&'a str>,
}

#[derive(Serialize)]
struct GetRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    access_token: &'a str,
    start_date: String,
    end_date: String,
    options: GetOptions,
}

#[derive(Serialize)]
struct GetOptions {
    count: usize,
    offset: usize,
}

/// Talks to the provider over HTTP.
///
/// Cheap to clone, the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct PlaidClient {
    http_client: Client,
    config: ProviderConfig,
}

impl PlaidClient {
    /// Create a new client for the provider described by `config`.
    ///
    /// # Errors
    /// Returns a [ProviderError::Network] if the HTTP client could not be
    /// created, e.g. because the TLS backend failed to initialise.
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let http_client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http_client,
            config,
        })
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.config.base_url, path);
        tracing::debug!("POST {url}");

        let response = self.http_client.post(&url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::warn!("provider responded to {path} with {status}");
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|error| ProviderError::MalformedBody {
            status: status.as_u16(),
            body: text,
            reason: error.to_string(),
        })
    }
}

#[async_trait]
impl TransactionProvider for PlaidClient {
    async fn fetch_sync_page(
        &self,
        credential: &ProviderCredential,
        cursor: Option<&str>,
    ) -> Result<SyncPage, ProviderError> {
        let request = SyncRequest {
            client_id: &self.config.client_id,
            secret: &self.config.secret,
            access_token: credential.expose(),
            cursor,
        };

        self.post("/transactions/sync", &request).await
    }

    async fn fetch_offset_page(
        &self,
        credential: &ProviderCredential,
        date_range: &DateRange,
        offset: usize,
        count: usize,
    ) -> Result<OffsetPage, ProviderError> {
        let request = GetRequest {
            client_id: &self.config.client_id,
            secret: &self.config.secret,
            access_token: credential.expose(),
            start_date: format_date(date_range.start()),
            end_date: format_date(date_range.end()),
            options: GetOptions { count, offset },
        };

        self.post("/transactions/get", &request).await
    }
}
