//! # Test Fixtures
//!
//! An in-process stand-in for the CoinMarketCap quotes endpoint. It binds
//! `127.0.0.1:0`, answers `GET /v2/cryptocurrency/quotes/latest` with a canned
//! status and body, and records what each request carried so tests can
//! assert on the outgoing symbol list (decoded and as sent) and headers.

use axum::{
    Router,
    extract::{Query, RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};
use lib_common::loggers::loggerlocal::{LoggerLocal, LoggerLocalOptions};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// What the mock saw on one request.
#[derive(Debug, Clone, Default)]
pub struct RecordedRequest {
    /// Decoded `symbol` query parameter.
    pub symbol: Option<String>,
    /// Query string exactly as it arrived, before any decoding.
    pub raw_query: Option<String>,
    /// `X-CMC_PRO_API_KEY` header.
    pub api_key: Option<String>,
    /// `Accept` header.
    pub accept: Option<String>,
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: String,
    delay: Option<Duration>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// A running mock server. The task is aborted on drop.
pub struct MockCmc {
    /// Base URL to hand to the client, e.g. `http://127.0.0.1:4321/v2`.
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: JoinHandle<()>,
}

impl MockCmc {
    /// Serves `body` with `status` on every quotes request.
    pub async fn start(status: u16, body: impl Into<String>) -> MockCmc {
        Self::start_with_delay(status, body, None).await
    }

    /// Like [`MockCmc::start`] but waits `delay` before answering.
    pub async fn start_with_delay(status: u16, body: impl Into<String>, delay: Option<Duration>) -> MockCmc {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            status: StatusCode::from_u16(status).expect("valid status code"),
            body: body.into(),
            delay,
            requests: Arc::clone(&requests),
        };

        let app = Router::new()
            .route("/v2/cryptocurrency/quotes/latest", get(quotes_latest))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock server");
        let addr = listener.local_addr().expect("mock server address");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        MockCmc {
            base_url: format!("http://{}/v2", addr),
            requests,
            handle,
        }
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl Drop for MockCmc {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn quotes_latest(
    State(state): State<MockState>,
    Query(query): Query<HashMap<String, String>>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
) -> impl IntoResponse {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    state.requests.lock().expect("requests lock").push(RecordedRequest {
        symbol: query.get("symbol").cloned(),
        raw_query,
        api_key: header("x-cmc_pro_api_key"),
        accept: header("accept"),
    });

    if let Some(delay) = state.delay {
        tokio::time::sleep(delay).await;
    }

    (state.status, [("content-type", "application/json")], state.body.clone())
}

/// A listing as the quotes endpoint returns it, with a USD quote.
pub fn listing(id: i64, name: &str, symbol: &str, price: f64, change_24h: f64) -> Value {
    json!({
        "id": id,
        "name": name,
        "symbol": symbol,
        "slug": name.to_lowercase(),
        "num_market_pairs": 10,
        "date_added": "2013-04-28T00:00:00.000Z",
        "tags": [{"slug": "mineable", "name": "Mineable", "category": "OTHERS"}],
        "max_supply": 21000000,
        "circulating_supply": 19000000,
        "total_supply": 19000000,
        "is_active": 1,
        "infinite_supply": false,
        "platform": null,
        "cmc_rank": id,
        "is_fiat": 0,
        "self_reported_circulating_supply": null,
        "self_reported_market_cap": null,
        "tvl_ratio": null,
        "last_updated": "2024-05-01T12:30:00.000Z",
        "quote": {
            "USD": {
                "price": price,
                "volume_24h": price * 500.0,
                "volume_change_24h": -3.2,
                "percent_change_1h": 0.1,
                "percent_change_24h": change_24h,
                "percent_change_7d": 4.0,
                "percent_change_30d": 9.0,
                "percent_change_60d": 12.0,
                "percent_change_90d": 20.0,
                "market_cap": price * 19000000.0,
                "market_cap_dominance": 52.1,
                "fully_diluted_market_cap": price * 21000000.0,
                "tvl": null,
                "last_updated": "2024-05-01T12:30:45.000Z"
            }
        }
    })
}

/// Wraps symbol groups in a success envelope.
pub fn success_body(data: Value) -> String {
    json!({
        "status": {
            "timestamp": "2024-05-01T12:31:00.000Z",
            "error_code": 0,
            "error_message": null,
            "elapsed": 25,
            "credit_count": 1,
            "notice": null
        },
        "data": data
    })
    .to_string()
}

/// A logger that discards everything.
pub fn silent_logger() -> Arc<LoggerLocal> {
    Arc::new(LoggerLocal::new("project_tests".to_string(), Some(LoggerLocalOptions::silent())))
}
