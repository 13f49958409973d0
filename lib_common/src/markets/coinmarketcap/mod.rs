//! # CoinMarketCap Integration Module
//!
//! ## Contained Modules:
//!
//! - **`apicallcmc`**: the HTTP client. Sanitises symbols, sends the
//!   authenticated batched request and classifies transport/HTTP failures.
//! - **`quotes`**: strict response models and the normalizer that keeps one
//!   USD quote per symbol (lowest listing id wins).
//! - **`error`**: the [`CmcError`] taxonomy shared by both.

/// HTTP client for the CoinMarketCap quotes endpoint.
pub mod apicallcmc;
/// Error taxonomy for quote lookups.
pub mod error;
/// Response models and the quote normalizer.
pub mod quotes;

pub use apicallcmc::{sanitize_symbols, CoinMarketCap, QuoteSource};
pub use error::CmcError;
pub use quotes::QuoteRecord;
