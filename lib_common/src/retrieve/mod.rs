//! # Data Retrieval Module
//!
//! Generic HTTP retrieval used by every API client in the workspace.
//!
//! - **`ky_http`**: an `ApiClient` built on `reqwest` and `reqwest-middleware`
//!   with base URL joining, credential injection, a request timeout and
//!   opt-in exponential backoff retries.
//!
//! Provider specific clients (CoinMarketCap, Telegram) own their parsing and
//! error classification and delegate the network plumbing to this layer.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Generic HTTP API client with optional retry middleware.
pub mod ky_http;
