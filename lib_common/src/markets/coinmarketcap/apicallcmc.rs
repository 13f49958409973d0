//! # CoinMarketCap API Client
//!
//! A dedicated client for the CoinMarketCap Pro quotes endpoint. It owns the
//! transport concerns: symbol sanitisation, the authenticated batched GET,
//! a fixed timeout and HTTP failure classification. Decoding and listing
//! selection are delegated to [`crate::markets::coinmarketcap::quotes`].
//!
//! ## Core Features:
//! - **Single batched request**: all requested symbols go out in one call.
//! - **No automatic retries**: a 5xx surfaces as [`CmcError::ServerError`] and
//!   the caller decides whether to try again.
//! - **Structured Logging**: request start, each failure and the parsed count
//!   go through the shared `LoggerLocal`.

use crate::loggers::loggerlocal::LoggerLocal;
use crate::markets::coinmarketcap::error::CmcError;
use crate::markets::coinmarketcap::quotes::{normalize, QuoteRecord};
use crate::retrieve::ky_http::{ApiAuth, ApiClient, ApiClientOptions};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Method;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Production base URL of the Pro API, version 2.
pub const DEFAULT_BASE_URL: &str = "https://pro-api.coinmarketcap.com/v2";
/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";
/// Path of the quotes endpoint relative to the base URL.
pub const QUOTES_PATH: &str = "cryptocurrency/quotes/latest";
/// Upper bound for one quotes call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Anything that can turn a comma separated symbol list into quotes.
///
/// The bot dispatcher depends on this trait rather than on the concrete
/// client so it can be driven without a network.
pub trait QuoteSource: Send + Sync {
    /// Fetches one quote per symbol in `symbols_csv`.
    fn get_quotes(&self, symbols_csv: &str) -> impl Future<Output = Result<Vec<QuoteRecord>, CmcError>> + Send;
}

/// Splits a user supplied list on commas, trims and upper-cases each part and
/// drops empty parts.
///
/// # Errors
/// [`CmcError::InvalidInput`] when nothing usable is left.
pub fn sanitize_symbols(symbols_csv: &str) -> Result<Vec<String>, CmcError> {
    let symbols: Vec<String> = symbols_csv
        .split(',')
        .map(|part| part.trim().to_uppercase())
        .filter(|part| !part.is_empty())
        .collect();

    if symbols.is_empty() {
        return Err(CmcError::InvalidInput {
            input: symbols_csv.to_string(),
        });
    }
    Ok(symbols)
}

/// Re-orders records to follow the requested symbol order.
///
/// Records whose symbol was not requested keep their relative order after
/// the requested ones.
pub fn order_by_request(mut records: Vec<QuoteRecord>, requested: &[String]) -> Vec<QuoteRecord> {
    records.sort_by_key(|record| {
        requested
            .iter()
            .position(|symbol| symbol.eq_ignore_ascii_case(&record.symbol))
            .unwrap_or(requested.len())
    });
    records
}

/// # CoinMarketCap Client
///
/// Holds the API key (inside the transport's auth header) and a pooled HTTP
/// client. Immutable after construction; share it behind an `Arc`.
pub struct CoinMarketCap {
    /// Transport pre-configured with base URL, key header and timeout.
    client: ApiClient,
    /// A shared logger for recording the outcomes of API calls.
    logger: Arc<LoggerLocal>,
}

impl CoinMarketCap {
    /// Client for the production API.
    ///
    /// # Errors
    /// Fails when the key is not a legal header value.
    pub fn new(api_key: &str, logger: Arc<LoggerLocal>) -> anyhow::Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key, logger)
    }

    /// Client for an arbitrary base URL (sandbox, mock server).
    ///
    /// # Errors
    /// Fails on an invalid URL or a key that is not a legal header value.
    pub fn with_base_url(base_url: &str, api_key: &str, logger: Arc<LoggerLocal>) -> anyhow::Result<Self> {
        let auth = ApiAuth::header(API_KEY_HEADER, api_key)?;
        let options = ApiClientOptions {
            timeout: Some(REQUEST_TIMEOUT),
            max_retries: 0,
        };
        Ok(Self {
            client: ApiClient::new(base_url, Some(auth), options)?,
            logger,
        })
    }

    /// Performs the GET and returns the raw 2xx body.
    ///
    /// ## Logic:
    /// 1. Send one GET with `Accept: application/json` and the key header.
    /// 2. Transport failure -> `Transport`.
    /// 3. Non-2xx -> read the body best effort, classify by status range.
    /// 4. 2xx -> read the full body; a failure here is `Read`.
    async fn fetch_raw(&self, symbols_param: &str) -> Result<Vec<u8>, CmcError> {
        let url = self
            .client
            .endpoint(QUOTES_PATH)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| QUOTES_PATH.to_string());

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let response = match self
            .client
            .send(Method::GET, QUOTES_PATH, &[("symbol", symbols_param)], Some(headers))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.logger
                    .error(
                        &format!("HTTP request failed: {}", e),
                        Some(json!({"url": url, "symbols": symbols_param})),
                    )
                    .await;
                return Err(CmcError::Transport(e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = CmcError::from_status(status.as_u16(), body);
            let kind = match &err {
                CmcError::ClientError { .. } => "client error (4xx)",
                CmcError::ServerError { .. } => "server error (5xx)",
                _ => "unexpected status",
            };
            let body_text = match &err {
                CmcError::ClientError { body, .. }
                | CmcError::ServerError { body, .. }
                | CmcError::UnexpectedStatus { body, .. } => body.as_str(),
                _ => "",
            };
            self.logger
                .error(
                    &format!("CoinMarketCap {}: status {}", kind, status.as_u16()),
                    Some(json!({"status": status.as_u16(), "url": url, "response": body_text})),
                )
                .await;
            return Err(err);
        }

        match response.bytes().await {
            Ok(bytes) => Ok(bytes.to_vec()),
            Err(e) => {
                self.logger
                    .error(&format!("Failed to read response body: {}", e), Some(json!({"url": url})))
                    .await;
                Err(CmcError::Read(e))
            }
        }
    }

    /// # Get Quotes
    ///
    /// Fetches USD quotes for one or more comma separated symbols.
    ///
    /// ## Logic:
    /// 1. Sanitise the input (`InvalidInput` when empty).
    /// 2. One GET to `{base}/cryptocurrency/quotes/latest?symbol=A,B,C`.
    /// 3. Normalize the body to one record per symbol.
    /// 4. Order the records like the request.
    ///
    /// Every error is returned unchanged; nothing is retried here.
    pub async fn get_quotes(&self, symbols_csv: &str) -> Result<Vec<QuoteRecord>, CmcError> {
        let symbols = match sanitize_symbols(symbols_csv) {
            Ok(symbols) => symbols,
            Err(e) => {
                self.logger
                    .error("No cryptocurrency symbols in request", Some(json!({"input": symbols_csv})))
                    .await;
                return Err(e);
            }
        };
        let symbols_param = symbols.join(",");

        self.logger
            .info(&format!("Requesting quotes for symbols: {}", symbols_param), None)
            .await;

        let body = self.fetch_raw(&symbols_param).await?;
        let records = normalize(&body, &self.logger).await?;

        Ok(order_by_request(records, &symbols))
    }
}

impl QuoteSource for CoinMarketCap {
    async fn get_quotes(&self, symbols_csv: &str) -> Result<Vec<QuoteRecord>, CmcError> {
        CoinMarketCap::get_quotes(self, symbols_csv).await
    }
}

impl<T: QuoteSource> QuoteSource for Arc<T> {
    fn get_quotes(&self, symbols_csv: &str) -> impl Future<Output = Result<Vec<QuoteRecord>, CmcError>> + Send {
        (**self).get_quotes(symbols_csv)
    }
}
