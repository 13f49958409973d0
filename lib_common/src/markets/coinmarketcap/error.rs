use thiserror::Error;

/// # CoinMarketCap Error
///
/// Every way a quote lookup can fail. The `Display` text is written for end
/// users; the dispatcher shows it verbatim after a failure marker.
#[derive(Debug, Error)]
pub enum CmcError {
    /// No usable symbol survived sanitisation.
    #[error("no cryptocurrency symbols given")]
    InvalidInput {
        /// The raw text the caller supplied.
        input: String,
    },

    /// Connection refused, DNS failure, TLS failure or the request timed out.
    #[error("request failed: {0}")]
    Transport(#[source] reqwest_middleware::Error),

    /// 4xx from the upstream. Retrying the same request will not help.
    #[error("bad request or symbol not found")]
    ClientError {
        /// HTTP status code.
        status: u16,
        /// Raw response body, best effort.
        body: String,
    },

    /// 5xx from the upstream. The caller may retry later.
    #[error("temporary server error, try again later")]
    ServerError {
        /// HTTP status code.
        status: u16,
        /// Raw response body, best effort.
        body: String,
    },

    /// Any other non-2xx status (1xx, 3xx, or outside the standard range).
    #[error("API returned status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Raw response body, best effort.
        body: String,
    },

    /// The status was 2xx but the body could not be read.
    #[error("failed to read response body: {0}")]
    Read(#[source] reqwest::Error),

    /// The body is not the JSON shape the quotes endpoint promises.
    #[error("failed to parse JSON response: {source}")]
    Decode {
        /// Size of the rejected payload in bytes.
        length: usize,
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },

    /// The envelope carried a non-zero `status.error_code`.
    #[error("API error: {message}")]
    Upstream {
        /// The upstream error code.
        code: i64,
        /// Upstream message, or "unknown error" when it sent none.
        message: String,
    },

    /// A well-formed response that yielded zero usable quotes.
    #[error("no cryptocurrencies found")]
    NotFound,
}

impl CmcError {
    /// Classifies a non-2xx HTTP status.
    ///
    /// `status` must not be a success code; the caller has already checked.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            400..=499 => CmcError::ClientError { status, body },
            500..=599 => CmcError::ServerError { status, body },
            _ => CmcError::UnexpectedStatus { status, body },
        }
    }

    /// `true` when repeating the same call later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CmcError::ServerError { .. } | CmcError::Transport(_))
    }

    /// HTTP status attached to the error, if there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            CmcError::ClientError { status, .. }
            | CmcError::ServerError { status, .. }
            | CmcError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
