//! # lib_common
//!
//! Shared building blocks for the price bot workspace. Every top-level module
//! sits behind a cargo feature of the same name so binaries only pull in the
//! dependencies they need.

// Declare the modules to re-export
#[cfg(feature = "loggers")]
pub mod loggers; // Parent module for logrecord and loggerlocal
#[cfg(feature = "markets")]
pub mod markets; // Market data providers (CoinMarketCap)
#[cfg(feature = "retrieve")]
pub mod retrieve; // Generic HTTP client

// Re-export the pieces most callers reach for
#[cfg(feature = "loggers")]
pub use loggers::loggerlocal::{LoggerLocal, LoggerLocalOptions};
#[cfg(feature = "loggers")]
pub use loggers::logrecord::Logrecord;
#[cfg(feature = "markets")]
pub use markets::coinmarketcap::{CmcError, CoinMarketCap, QuoteRecord, QuoteSource};
