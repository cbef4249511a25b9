//! HTTP client for the OHLCV data service.

use async_trait::async_trait;
use bytes::Bytes;
use candlesync_types::{RawBar, Symbol};
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    FetchError, OhlcvSource, PageRequest,
    parse::{parse_ohlcv_page, parse_spreads, parse_tables},
    url::{DEFAULT_BASE_URL, ohlcv_url, spreads_url, tables_url},
};

/// Configuration for the REST client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Data service base URL.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum retry attempts for failed requests.
    pub max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds).
    pub base_delay_ms: u64,
    /// Maximum delay between retries (in milliseconds).
    pub max_delay_ms: u64,
    /// User agent string.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            // A failed page is reported, not retried; the next trigger asks again.
            max_retries: 0,
            base_delay_ms: 500,
            max_delay_ms: 5_000,
            user_agent: format!("candlesync/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration for the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry budget for transient failures.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// HTTP client with connection pooling for the `/ohlcv`, `/tables` and
/// `/spreads` endpoints.
#[derive(Debug, Clone)]
pub struct OhlcvClient {
    client: Client,
    config: ClientConfig,
}

impl OhlcvClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: ClientConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()?;
        Ok(Self { client, config })
    }

    /// Creates a client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_defaults() -> Result<Self, FetchError> {
        Self::new(ClientConfig::default())
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetches one page of raw bars.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// body that is not a JSON array.
    pub async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<RawBar>, FetchError> {
        let url = ohlcv_url(&self.config.base_url, request)?;
        let body = self.get(url).await?;
        let raws = parse_ohlcv_page(&body)?;
        debug!(
            symbol = %request.symbol,
            interval = request.timeframe.interval(),
            offset = request.offset,
            records = raws.len(),
            "fetched page"
        );
        Ok(raws)
    }

    /// Fetches the plain instrument symbol list.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    pub async fn fetch_tables(&self) -> Result<Vec<Symbol>, FetchError> {
        let body = self.get(tables_url(&self.config.base_url)?).await?;
        parse_tables(&body)
    }

    /// Fetches the spread symbol list.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or decoding fails.
    pub async fn fetch_spreads(&self) -> Result<Vec<Symbol>, FetchError> {
        let body = self.get(spreads_url(&self.config.base_url)?).await?;
        parse_spreads(&body)
    }

    /// Performs a GET, retrying transient failures up to `max_retries` times.
    async fn get(&self, url: Url) -> Result<Bytes, FetchError> {
        let mut attempts = 0;

        loop {
            match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS
                    {
                        if attempts < self.config.max_retries {
                            attempts += 1;
                            let delay = self.calculate_backoff_delay(attempts);
                            warn!(%url, status = status.as_u16(), ?delay, "retrying request");
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        return Err(FetchError::Status {
                            status: status.as_u16(),
                        });
                    }
                    if !status.is_success() {
                        return Err(FetchError::Status {
                            status: status.as_u16(),
                        });
                    }
                    return Ok(response.bytes().await?);
                }
                Err(e) if self.is_retryable_error(&e) && attempts < self.config.max_retries => {
                    attempts += 1;
                    let delay = self.calculate_backoff_delay(attempts);
                    warn!(%url, error = %e, ?delay, "retrying request");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Calculates the backoff delay with exponential backoff and jitter.
    fn calculate_backoff_delay(&self, attempt: u32) -> Duration {
        let exp_delay = self
            .config
            .base_delay_ms
            .saturating_mul(1u64 << attempt.min(10));
        let capped_delay = exp_delay.min(self.config.max_delay_ms);

        // Deterministic ±25% jitter
        let jitter_range = capped_delay / 4;
        let jitter = if jitter_range > 0 {
            let jitter_offset = (u64::from(attempt) * 17) % (jitter_range * 2);
            jitter_offset as i64 - jitter_range as i64
        } else {
            0
        };

        let final_delay = (capped_delay as i64 + jitter).max(100) as u64;
        Duration::from_millis(final_delay)
    }

    /// Determines if an error is retryable.
    fn is_retryable_error(&self, error: &reqwest::Error) -> bool {
        if error.is_builder() {
            return false;
        }
        error.is_timeout() || error.is_connect() || error.is_request()
    }
}

#[async_trait]
impl OhlcvSource for OhlcvClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<RawBar>, FetchError> {
        Self::fetch_page(self, request).await
    }
}
