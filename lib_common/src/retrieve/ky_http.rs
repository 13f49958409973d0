//! # HTTP Retrieval Utilities
//!
//! This module provides an asynchronous API client wrapper around `reqwest`.
//! It carries a base URL, an optional credential that is attached to every
//! request, a per-request timeout and, when asked for, exponential backoff
//! retries through `reqwest-middleware`.
//!
//! Two levels of access are offered:
//! - [`ApiClient::send`] hands back the raw `reqwest::Response` so callers can
//!   classify status codes and read the body themselves.
//! - [`ApiClient::request`] wraps the common JSON round trip into an
//!   [`ApiResponse`].

use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE},
    Method, Url,
};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::{de::DeserializeOwned, Serialize};
use url::form_urlencoded::byte_serialize;

/// A standardized container for API responses.
///
/// This struct wraps the deserialized data along with metadata about the
/// HTTP transaction, such as status codes and headers.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The successfully deserialized response body, if any.
    pub data: Option<T>,
    /// The raw error body returned by the server if the request failed.
    pub error_body: Option<String>,
    /// The numeric HTTP status code.
    pub status: u16,
    /// Indicates if the status code was in the 2xx range.
    pub success: bool,
    /// The headers returned by the server.
    pub headers: HeaderMap,
}

/// Credential attached to every outgoing request as a provider specific
/// header, e.g. `X-CMC_PRO_API_KEY`.
#[derive(Debug, Clone)]
pub enum ApiAuth {
    /// Header name and value; the value is marked sensitive.
    Header(HeaderName, HeaderValue),
}

impl ApiAuth {
    /// Builds an [`ApiAuth::Header`] from plain strings.
    ///
    /// # Errors
    /// Fails when the name or value is not a legal HTTP header.
    pub fn header(name: &str, value: &str) -> anyhow::Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        let mut value = HeaderValue::from_str(value)?;
        value.set_sensitive(true);
        Ok(ApiAuth::Header(name, value))
    }
}

/// Transport tuning for an [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ApiClientOptions {
    /// Upper bound for a whole request, connect to last body byte.
    pub timeout: Option<Duration>,
    /// Transient failures are retried this many times. `0` disables the retry middleware.
    pub max_retries: u32,
}

impl Default for ApiClientOptions {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            max_retries: 3,
        }
    }
}

/// A flexible asynchronous HTTP client.
///
/// Built on top of `reqwest_middleware`, it handles base URLs,
/// authentication and, optionally, automatic retries. Cloning is cheap and
/// shares the underlying connection pool.
#[derive(Clone)]
pub struct ApiClient {
    /// The underlying middleware-enabled client.
    inner: ClientWithMiddleware,
    /// The base URL to which all relative paths are joined. Always ends with `/`.
    base_url: Url,
    /// Optional credential injected into every request.
    auth: Option<ApiAuth>,
}

impl ApiClient {
    /// Creates a new `ApiClient`.
    ///
    /// # Arguments
    /// * `base_url` - The absolute base URL for the API (e.g., "https://api.example.com/v1").
    ///   A trailing slash is added when missing so relative paths join under it.
    /// * `auth` - An optional credential for every request.
    /// * `options` - Timeout and retry settings.
    ///
    /// # Errors
    /// Returns an error if `base_url` is not a valid absolute URL or the TLS
    /// backend cannot be initialised.
    pub fn new(base_url: &str, auth: Option<ApiAuth>, options: ApiClientOptions) -> anyhow::Result<Self> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let url = Url::parse(&base)?;
        if url.cannot_be_a_base() {
            anyhow::bail!("Invalid Base URL (must be absolute): {}", base_url);
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let mut client = ClientBuilder::new(builder.build()?);

        if options.max_retries > 0 {
            let retry_policy = ExponentialBackoff::builder().build_with_max_retries(options.max_retries);
            client = client.with(RetryTransientMiddleware::new_with_policy(retry_policy));
        }

        Ok(Self {
            inner: client.build(),
            base_url: url,
            auth,
        })
    }

    /// The normalised base URL, always with a trailing slash.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves `path` against the base URL.
    ///
    /// A leading `/` on `path` is ignored so it never escapes the base path.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path.trim_start_matches('/'))
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Some(ApiAuth::Header(name, value)) => req.header(name.clone(), value.clone()),
            None => req,
        }
    }

    /// Sends a request and returns the raw response without looking at the status.
    ///
    /// Query values are treated as comma separated lists: every item is
    /// form-encoded on its own and the separating commas go out literally.
    ///
    /// # Errors
    /// Transport level failures only (connect, DNS, TLS, timeout). Non-2xx
    /// responses come back as `Ok`.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        headers: Option<HeaderMap>,
    ) -> Result<reqwest::Response, reqwest_middleware::Error> {
        let mut url = self
            .endpoint(path)
            .map_err(|e| reqwest_middleware::Error::Middleware(e.into()))?;
        if !query.is_empty() {
            url.set_query(Some(&encode_query(query)));
        }
        let mut req = self.inner.request(method, url);

        if let Some(h) = headers {
            req = req.headers(h);
        }
        req = self.authorize(req);

        req.send().await
    }

    /// Performs a JSON request and handles the response.
    ///
    /// # Arguments
    /// * `method` - The HTTP verb (GET, POST, etc.).
    /// * `path` - The relative path to append to the base URL.
    /// * `headers` - Optional additional headers for this specific request.
    /// * `body` - Optional serializable object to send as the JSON body.
    ///
    /// # Errors
    /// Returns an `anyhow::Error` if URL joining, network execution or
    /// decoding a 2xx body fails. Non-2xx statuses are reported through
    /// [`ApiResponse::success`].
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        headers: Option<HeaderMap>,
        body: Option<B>,
    ) -> anyhow::Result<ApiResponse<T>>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let full_url = self.endpoint(path)?;
        let mut req = self.inner.request(method, full_url);

        if let Some(h) = headers {
            req = req.headers(h);
        }
        req = self.authorize(req);
        if let Some(b) = body {
            let json_body = serde_json::to_string(&b)?;
            req = req.header(CONTENT_TYPE, "application/json").body(json_body);
        }

        let response: reqwest::Response = req.send().await?;
        let status = response.status();
        let resp_headers = response.headers().clone();

        if status.is_success() {
            let data = response.json::<T>().await?;
            Ok(ApiResponse {
                data: Some(data),
                error_body: None,
                status: status.as_u16(),
                success: true,
                headers: resp_headers,
            })
        } else {
            // Capture the error body as a string for debugging
            let error_text = response.text().await.ok();
            Ok(ApiResponse {
                data: None,
                error_body: error_text,
                status: status.as_u16(),
                success: false,
                headers: resp_headers,
            })
        }
    }
}

/// Form-encodes `query`, keeping the commas between list items literal.
fn encode_query(query: &[(&str, &str)]) -> String {
    query
        .iter()
        .map(|(key, value)| {
            let items: Vec<String> = value
                .split(',')
                .map(|item| byte_serialize(item.as_bytes()).collect())
                .collect();
            format!("{}={}", byte_serialize(key.as_bytes()).collect::<String>(), items.join(","))
        })
        .collect::<Vec<_>>()
        .join("&")
}
