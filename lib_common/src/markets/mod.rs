//! # Financial Market APIs Module
//!
//! Client implementations for specific market data providers. Each provider
//! module owns its strict response models and turns upstream payloads into
//! normalized records for the rest of the system.
//!
//! ## Contained Modules:
//!
//! - **`coinmarketcap`**: Quote client for the CoinMarketCap Pro API. Builds
//!   authenticated batched requests, classifies failures, and reduces the
//!   multi-listing-per-symbol payload to one USD quote per symbol.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Client and data models for CoinMarketCap cryptocurrency quotes.
pub mod coinmarketcap;
