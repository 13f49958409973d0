//! Test doubles for the bot: an in-process Telegram Bot API that records
//! every call, and a quote source that answers without a network.

use crate::price_logic::telegram::TelegramApi;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
};
use lib_common::markets::coinmarketcap::{sanitize_symbols, CmcError, QuoteRecord, QuoteSource};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const TOKEN: &str = "123456:TEST-TOKEN";

/// Message id handed out for the first `sendMessage`.
pub const FIRST_MESSAGE_ID: i64 = 100;

/// One Bot API call as the mock received it.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Token taken from the `bot<token>` path segment.
    pub token: String,
    pub method: String,
    pub body: Value,
}

/// How the mock answers `sendMessage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// HTTP 400 with a Bot API error body.
    HttpError,
    /// HTTP 200 with `ok: false`.
    Rejected,
}

#[derive(Clone)]
struct MockState {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    pending_updates: Arc<Mutex<Vec<Value>>>,
    next_message_id: Arc<AtomicI64>,
    send_outcome: SendOutcome,
}

pub struct MockTelegram {
    /// Root URL to hand to [`TelegramApi::new`].
    pub api_url: String,
    state: MockState,
    handle: JoinHandle<()>,
}

impl MockTelegram {
    pub async fn start() -> MockTelegram {
        Self::start_with(Vec::new(), SendOutcome::Delivered).await
    }

    /// `updates` are returned by the first `getUpdates`; later polls come back empty.
    pub async fn with_updates(updates: Vec<Value>) -> MockTelegram {
        Self::start_with(updates, SendOutcome::Delivered).await
    }

    pub async fn with_send_outcome(outcome: SendOutcome) -> MockTelegram {
        Self::start_with(Vec::new(), outcome).await
    }

    async fn start_with(updates: Vec<Value>, send_outcome: SendOutcome) -> MockTelegram {
        let state = MockState {
            calls: Arc::new(Mutex::new(Vec::new())),
            pending_updates: Arc::new(Mutex::new(updates)),
            next_message_id: Arc::new(AtomicI64::new(FIRST_MESSAGE_ID)),
            send_outcome,
        };

        let app = Router::new()
            .route("/{bot}/{method}", post(dispatch))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock telegram");
        let addr = listener.local_addr().expect("mock telegram address");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        MockTelegram {
            api_url: format!("http://{}", addr),
            state,
            handle,
        }
    }

    /// A client pointed at this mock, with a one second long-poll timeout.
    pub fn api(&self) -> TelegramApi {
        TelegramApi::new(&self.api_url, TOKEN, Duration::from_secs(1)).expect("telegram client")
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.calls.lock().expect("calls lock").clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.method == method).collect()
    }
}

impl Drop for MockTelegram {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn ok(result: Value) -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({"ok": true, "result": result})))
}

async fn dispatch(
    State(state): State<MockState>,
    Path((bot, method)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.calls.lock().expect("calls lock").push(RecordedCall {
        token: bot.trim_start_matches("bot").to_string(),
        method: method.clone(),
        body: body.clone(),
    });

    match method.as_str() {
        "getMe" => ok(json!({"id": 1, "is_bot": true, "first_name": "Quotes", "username": "quotes_bot"})),
        "getUpdates" => {
            let updates = std::mem::take(&mut *state.pending_updates.lock().expect("updates lock"));
            if updates.is_empty() {
                // Stand-in for the server side long-poll wait
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            ok(Value::Array(updates))
        }
        "sendMessage" => match state.send_outcome {
            SendOutcome::Delivered => {
                let message_id = state.next_message_id.fetch_add(1, Ordering::SeqCst);
                ok(json!({
                    "message_id": message_id,
                    "chat": {"id": body["chat_id"], "type": "private"},
                    "date": 1700000000,
                    "text": body["text"],
                }))
            }
            SendOutcome::HttpError => (
                StatusCode::BAD_REQUEST,
                Json(json!({"ok": false, "error_code": 400, "description": "Bad Request: chat not found"})),
            ),
            SendOutcome::Rejected => (
                StatusCode::OK,
                Json(json!({"ok": false, "error_code": 403, "description": "Forbidden: bot was blocked by the user"})),
            ),
        },
        "deleteMessage" => ok(json!(true)),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({"ok": false, "error_code": 404, "description": "Not Found"})),
        ),
    }
}

/// A private-chat text message update.
pub fn text_update(update_id: i64, chat_id: i64, text: &str) -> Value {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id * 10,
            "from": {"id": chat_id, "is_bot": false, "first_name": "Ann", "username": "ann"},
            "chat": {"id": chat_id, "type": "private"},
            "date": 1700000000,
            "text": text,
        }
    })
}

/// Answers every symbol with a $100 quote and counts the lookups.
#[derive(Default)]
pub struct FixedQuotes {
    pub calls: AtomicUsize,
}

impl QuoteSource for FixedQuotes {
    async fn get_quotes(&self, symbols_csv: &str) -> Result<Vec<QuoteRecord>, CmcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let symbols = sanitize_symbols(symbols_csv)?;
        Ok(symbols
            .into_iter()
            .enumerate()
            .map(|(i, symbol)| QuoteRecord {
                id: i as i64 + 1,
                name: symbol.clone(),
                symbol,
                price: 100.0,
                percent_change_24h: 1.0,
                market_cap: 1e9,
                volume_24h: 1e6,
                last_updated: String::new(),
            })
            .collect())
    }
}
