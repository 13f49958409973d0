//! # CoinMarketCap Quote Models and Normalizer
//!
//! Strict `serde` models for the `v2/cryptocurrency/quotes/latest` payload and
//! the reduction from "symbol -> competing listings" to one [`QuoteRecord`]
//! per symbol.
//!
//! ## Selection rule
//! Several coins may share a ticker (forks, scam tokens reusing `BTC`). The
//! canonical listing of a group is the one with the lowest `id`; on equal ids
//! the first one in upstream order wins. Only the `USD` quote is read.
//!
//! Fields of unpredictable shape (`platform`, `tvl`, `notice`, ...) are kept as
//! raw `serde_json::Value` and never interpreted.

use crate::loggers::loggerlocal::LoggerLocal;
use crate::markets::coinmarketcap::error::CmcError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};

/// Quote currency consumed from every listing.
pub const QUOTE_CURRENCY: &str = "USD";

/// One normalized price quote, USD denominated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    /// CoinMarketCap id of the canonical listing.
    pub id: i64,
    /// Display name, e.g. "Bitcoin".
    pub name: String,
    /// Ticker, e.g. "BTC".
    pub symbol: String,
    /// Price in USD.
    pub price: f64,
    /// Percent change over the last 24 hours.
    pub percent_change_24h: f64,
    /// Market capitalization in USD.
    pub market_cap: f64,
    /// Traded volume over the last 24 hours in USD.
    pub volume_24h: f64,
    /// RFC 3339 timestamp of the quote, empty if the upstream omitted it.
    pub last_updated: String,
}

/// Top-level response: status envelope plus listings grouped by symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiQuoteResponse {
    /// Request outcome; a non-zero code voids `data`.
    pub status: ApiStatus,
    /// Symbol -> listings sharing that ticker. Absent on most error responses.
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: BTreeMap<String, Vec<ApiListing>>,
}

/// The `status` envelope attached to every response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiStatus {
    /// Server time of the response.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// `0` on success.
    pub error_code: i64,
    /// Human readable error. Usually a string, `null` on success.
    #[serde(default)]
    pub error_message: Option<Value>,
    /// Milliseconds spent server side.
    #[serde(default, deserialize_with = "null_as_default")]
    pub elapsed: i64,
    /// API credits consumed by the call.
    #[serde(default, deserialize_with = "null_as_default")]
    pub credit_count: i64,
    /// Free-form notice, shape not documented.
    #[serde(default)]
    pub notice: Option<Value>,
}

impl ApiStatus {
    /// The upstream message as sent when it is a string (even an empty one),
    /// else "unknown error".
    pub fn message(&self) -> String {
        self.error_message
            .as_ref()
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string()
    }
}

/// A tag attached to a listing. Older payloads send bare slugs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiTag {
    /// `{ "slug": .., "name": .., "category": .. }`
    Detailed {
        /// Machine name.
        slug: String,
        /// Display name.
        #[serde(default)]
        name: String,
        /// Tag category, e.g. "INDUSTRY".
        #[serde(default)]
        category: String,
    },
    /// Plain slug string.
    Slug(String),
}

/// One coin listed under a symbol. Only `id`, `name`, `symbol` and the `USD`
/// quote feed a [`QuoteRecord`]; the rest is modelled for completeness.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ApiListing {
    /// CoinMarketCap id; the lowest id wins a symbol group.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub num_market_pairs: Option<i64>,
    #[serde(default)]
    pub date_added: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<ApiTag>,
    #[serde(default)]
    pub max_supply: Option<f64>,
    #[serde(default)]
    pub circulating_supply: Option<f64>,
    #[serde(default)]
    pub total_supply: Option<f64>,
    #[serde(default)]
    pub is_active: Option<i64>,
    #[serde(default)]
    pub infinite_supply: Option<bool>,
    #[serde(default)]
    pub minted_market_cap: Option<f64>,
    /// Token platform (chain and contract), shape varies.
    #[serde(default)]
    pub platform: Option<Value>,
    #[serde(default)]
    pub cmc_rank: Option<i64>,
    #[serde(default)]
    pub is_fiat: Option<i64>,
    #[serde(default)]
    pub self_reported_circulating_supply: Option<Value>,
    #[serde(default)]
    pub self_reported_market_cap: Option<Value>,
    #[serde(default)]
    pub tvl_ratio: Option<Value>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    /// Currency code -> quote.
    #[serde(default, deserialize_with = "null_as_default")]
    pub quote: HashMap<String, ApiQuote>,
}

/// Market data for a listing in one currency.
///
/// Inactive coins come back with `null` numbers; those read as `0.0`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ApiQuote {
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub volume_24h: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub volume_change_24h: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub percent_change_1h: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub percent_change_24h: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub percent_change_7d: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub percent_change_30d: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub percent_change_60d: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub percent_change_90d: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub market_cap: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub market_cap_dominance: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fully_diluted_market_cap: f64,
    #[serde(default)]
    pub tvl: Option<Value>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Treats an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Why a symbol group produced no record.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The group had no listings at all.
    EmptyGroup,
    /// The canonical listing has no `USD` quote.
    MissingUsdQuote {
        /// Id of the listing that was chosen.
        id: i64,
    },
}

/// Outcome of [`select_quotes`]: what was kept and what was dropped.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// One record per usable symbol group, in group iteration order.
    pub records: Vec<QuoteRecord>,
    /// Symbols that were dropped, with the reason.
    pub skipped: Vec<(String, SkipReason)>,
}

/// Decodes a raw quotes payload.
///
/// # Errors
/// [`CmcError::Decode`] with the payload length; the payload itself is never
/// copied into the error.
pub fn decode(raw: &[u8]) -> Result<ApiQuoteResponse, CmcError> {
    serde_json::from_slice::<ApiQuoteResponse>(raw).map_err(|source| CmcError::Decode {
        length: raw.len(),
        source,
    })
}

/// Lowest id wins; on equal ids the earliest listing wins.
pub fn canonical_listing(listings: &[ApiListing]) -> Option<&ApiListing> {
    listings.iter().min_by_key(|listing| listing.id)
}

/// Builds the output record from a listing and its USD quote.
pub fn to_record(listing: &ApiListing, usd: &ApiQuote) -> QuoteRecord {
    QuoteRecord {
        id: listing.id,
        name: listing.name.clone(),
        symbol: listing.symbol.clone(),
        price: usd.price,
        percent_change_24h: usd.percent_change_24h,
        market_cap: usd.market_cap,
        volume_24h: usd.volume_24h,
        last_updated: usd
            .last_updated
            .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default(),
    }
}

/// Reduces every symbol group to at most one record.
///
/// Does not look at the status envelope; see [`normalize`]. Groups are
/// visited in sorted symbol order, which is an implementation detail and not
/// an ordering promise.
pub fn select_quotes(response: &ApiQuoteResponse) -> Selection {
    let mut selection = Selection::default();

    for (symbol, listings) in &response.data {
        let Some(listing) = canonical_listing(listings) else {
            selection.skipped.push((symbol.clone(), SkipReason::EmptyGroup));
            continue;
        };

        match listing.quote.get(QUOTE_CURRENCY) {
            Some(usd) => selection.records.push(to_record(listing, usd)),
            None => selection
                .skipped
                .push((symbol.clone(), SkipReason::MissingUsdQuote { id: listing.id })),
        }
    }

    selection
}

/// Turns a raw 2xx body into quote records.
///
/// ## Logic:
/// 1. Decode the payload (`Decode` on malformed JSON).
/// 2. A non-zero `status.error_code` fails the whole response with `Upstream`,
///    whatever `data` holds.
/// 3. Reduce each symbol group with [`select_quotes`]; dropped symbols are
///    logged as warnings and do not fail the call.
/// 4. Zero records is `NotFound`.
pub async fn normalize(raw: &[u8], logger: &LoggerLocal) -> Result<Vec<QuoteRecord>, CmcError> {
    let response = match decode(raw) {
        Ok(response) => response,
        Err(e) => {
            logger
                .error(&format!("Failed to parse quotes response: {}", e), Some(json!({"body_length": raw.len()})))
                .await;
            return Err(e);
        }
    };

    if response.status.error_code != 0 {
        let message = response.status.message();
        logger
            .error(
                "CoinMarketCap returned an API error",
                Some(json!({
                    "error_code": response.status.error_code,
                    "error_message": response.status.error_message,
                })),
            )
            .await;
        return Err(CmcError::Upstream {
            code: response.status.error_code,
            message,
        });
    }

    let selection = select_quotes(&response);

    for (symbol, reason) in &selection.skipped {
        match reason {
            SkipReason::EmptyGroup => {
                logger.warn(&format!("Empty listing array for symbol: {}", symbol), None).await;
            }
            SkipReason::MissingUsdQuote { id } => {
                logger
                    .warn(
                        &format!("USD quote not found for symbol: {}", symbol),
                        Some(json!({"symbol": symbol, "id": id})),
                    )
                    .await;
            }
        }
    }

    for record in &selection.records {
        let candidates = response.data.get(&record.symbol).map(Vec::len).unwrap_or(1);
        logger
            .debug(
                &format!("Selected listing {} for symbol: {}", record.id, record.symbol),
                Some(json!({"candidates": candidates})),
            )
            .await;
    }

    if selection.records.is_empty() {
        logger.error("No cryptocurrencies found in API response", None).await;
        return Err(CmcError::NotFound);
    }

    logger
        .info(
            &format!("Parsed {} cryptocurrencies", selection.records.len()),
            Some(json!({"credit_count": response.status.credit_count})),
        )
        .await;
    Ok(selection.records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loggers::loggerlocal::LoggerLocalOptions;

    fn silent() -> LoggerLocal {
        LoggerLocal::new("quotes_test".to_string(), Some(LoggerLocalOptions::silent()))
    }

    fn listing(id: i64, symbol: &str, price: f64) -> Value {
        json!({
            "id": id,
            "name": format!("Coin {}", id),
            "symbol": symbol,
            "slug": format!("coin-{}", id),
            "tags": [{"slug": "mineable", "name": "Mineable", "category": "OTHERS"}],
            "platform": null,
            "quote": {
                "USD": {
                    "price": price,
                    "volume_24h": price * 10.0,
                    "percent_change_24h": 1.5,
                    "market_cap": price * 1000.0,
                    "tvl": null,
                    "last_updated": "2024-05-01T12:30:45.000Z"
                }
            }
        })
    }

    fn payload(data: Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "status": {
                "timestamp": "2024-05-01T12:31:00.000Z",
                "error_code": 0,
                "error_message": null,
                "elapsed": 12,
                "credit_count": 1,
                "notice": null
            },
            "data": data
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_lowest_id_wins_duplicate_ticker() {
        let raw = payload(json!({"BTC": [listing(5, "BTC", 0.01), listing(3, "BTC", 65000.0)]}));
        let records = normalize(&raw, &silent()).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 3);
        assert_eq!(records[0].price, 65000.0);
        assert_eq!(records[0].market_cap, 65_000_000.0);
        assert_eq!(records[0].last_updated, "2024-05-01T12:30:45Z");
    }

    #[test]
    fn test_selection_ignores_listing_order() {
        let ids = [7, 2, 9, 4];
        let mut listings: Vec<ApiListing> = ids
            .iter()
            .map(|id| serde_json::from_value(listing(*id, "ETH", *id as f64)).unwrap())
            .collect();

        for _ in 0..ids.len() {
            listings.rotate_left(1);
            assert_eq!(canonical_listing(&listings).unwrap().id, 2);
            let mut reversed = listings.clone();
            reversed.reverse();
            assert_eq!(canonical_listing(&reversed).unwrap().id, 2);
        }
    }

    #[test]
    fn test_equal_ids_keep_first_seen() {
        let first: ApiListing = serde_json::from_value(listing(1, "X", 1.0)).unwrap();
        let mut second = first.clone();
        second.name = "Second".to_string();
        let group = vec![first, second];
        assert_eq!(canonical_listing(&group).unwrap().name, "Coin 1");
    }

    #[tokio::test]
    async fn test_symbol_without_usd_is_skipped() {
        let mut eur_only = listing(1027, "ETH", 3000.0);
        eur_only["quote"] = json!({"EUR": {"price": 2800.0}});
        let raw = payload(json!({"BTC": [listing(1, "BTC", 65000.0)], "ETH": [eur_only]}));

        let response = decode(&raw).unwrap();
        let selection = select_quotes(&response);
        assert_eq!(selection.skipped, vec![("ETH".to_string(), SkipReason::MissingUsdQuote { id: 1027 })]);

        let records = normalize(&raw, &silent()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].symbol, "BTC");
    }

    #[tokio::test]
    async fn test_non_zero_error_code_wins_over_data() {
        let raw = serde_json::to_vec(&json!({
            "status": {"error_code": 1002, "error_message": "API key missing."},
            "data": {"BTC": [listing(1, "BTC", 65000.0)]}
        }))
        .unwrap();

        match normalize(&raw, &silent()).await {
            Err(CmcError::Upstream { code, message }) => {
                assert_eq!(code, 1002);
                assert_eq!(message, "API key missing.");
            }
            other => panic!("expected Upstream, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_without_message_is_unknown() {
        let raw = br#"{"status": {"error_code": 500, "error_message": null}}"#;
        let err = normalize(raw, &silent()).await.unwrap_err();
        assert_eq!(err.to_string(), "API error: unknown error");
    }

    #[tokio::test]
    async fn test_empty_error_message_is_kept_as_sent() {
        let raw = br#"{"status": {"error_code": 1, "error_message": ""}}"#;
        match normalize(raw, &silent()).await {
            Err(CmcError::Upstream { code, message }) => {
                assert_eq!(code, 1);
                assert_eq!(message, "");
            }
            other => panic!("expected Upstream, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_selection_is_logged_at_debug() {
        let dir = tempfile::tempdir().unwrap();
        let logger = LoggerLocal::new(
            "quotes_test".to_string(),
            Some(LoggerLocalOptions {
                use_tty: None,
                use_file: Some(vec![2]),
                log_dir: Some(dir.path().to_path_buf()),
            }),
        );
        let raw = payload(json!({"BTC": [listing(5, "BTC", 0.01), listing(3, "BTC", 65000.0)]}));

        normalize(&raw, &logger).await.unwrap();

        let contents = std::fs::read_to_string(logger.log_file().unwrap()).unwrap();
        assert!(contents.contains("[DEBUG] Selected listing 3 for symbol: BTC"));
        assert!(contents.contains(r#""candidates":2"#));
    }

    #[tokio::test]
    async fn test_empty_or_usd_less_groups_are_not_found() {
        let mut no_usd = listing(1, "DOGE", 0.1);
        no_usd["quote"] = json!({});
        let raw = payload(json!({"BTC": [], "DOGE": [no_usd]}));

        let err = normalize(&raw, &silent()).await.unwrap_err();
        assert!(matches!(err, CmcError::NotFound));
    }

    #[tokio::test]
    async fn test_malformed_json_reports_length_only() {
        let raw = b"{\"status\": {\"error_code\": 0}, \"data\": [";
        match normalize(raw, &silent()).await {
            Err(CmcError::Decode { length, .. }) => assert_eq!(length, raw.len()),
            other => panic!("expected Decode, got {:?}", other),
        }
    }

    #[test]
    fn test_null_numbers_and_string_tags_decode() {
        let raw = payload(json!({"OLD": [{
            "id": 99,
            "name": "Old Coin",
            "symbol": "OLD",
            "tags": ["mineable", "pow"],
            "max_supply": null,
            "quote": {"USD": {"price": null, "volume_24h": null, "market_cap": null, "last_updated": null}}
        }]}));

        let response = decode(&raw).unwrap();
        let selection = select_quotes(&response);
        let record = &selection.records[0];
        assert_eq!(record.price, 0.0);
        assert_eq!(record.last_updated, "");
        assert!(matches!(response.data["OLD"][0].tags[0], ApiTag::Slug(ref s) if s == "mineable"));
    }
}
