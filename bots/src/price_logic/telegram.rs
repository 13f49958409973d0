//! Minimal Telegram Bot API client: long polling, sending and deleting messages.
//!
//! Every method is a JSON POST to `{api_url}/bot{token}/{method}` answered with
//! the `{ok, result, description}` envelope.

use anyhow::{anyhow, Result};
use lib_common::retrieve::ky_http::{ApiClient, ApiClientOptions};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub date: i64,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    Markdown,
}

pub struct TelegramApi {
    client: ApiClient,
    token: String,
}

impl TelegramApi {
    /// `poll_timeout` is the server side long-poll wait; the HTTP timeout is
    /// set comfortably above it.
    pub fn new(api_url: &str, token: &str, poll_timeout: Duration) -> Result<Self> {
        let base = format!("{}/bot{}/", api_url.trim_end_matches('/'), token);
        let options = ApiClientOptions {
            timeout: Some(poll_timeout + Duration::from_secs(10)),
            max_retries: 3,
        };
        let client = ApiClient::new(&base, None, options).map_err(|e| anyhow!(redact(&e.to_string(), token)))?;
        Ok(Self {
            client,
            token: token.to_string(),
        })
    }

    async fn call<T, B>(&self, method: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let response = self
            .client
            .request::<TelegramResponse<T>, &B>(Method::POST, method, None, Some(body))
            .await
            // reqwest errors embed the URL, which embeds the token
            .map_err(|e| anyhow!("Telegram {} failed: {}", method, redact(&e.to_string(), &self.token)))?;

        if !response.success {
            let description = response
                .error_body
                .as_deref()
                .and_then(|b| serde_json::from_str::<TelegramResponse<serde_json::Value>>(b).ok())
                .and_then(|r| r.description)
                .unwrap_or_else(|| "no description".to_string());
            return Err(anyhow!("Telegram {} returned HTTP {}: {}", method, response.status, description));
        }

        let envelope = response
            .data
            .ok_or_else(|| anyhow!("Telegram {} returned an empty body", method))?;
        unwrap_envelope(method, envelope)
    }

    pub async fn get_me(&self) -> Result<User> {
        self.call("getMe", &json!({})).await
    }

    pub async fn get_updates(&self, offset: Option<i64>, timeout: Duration) -> Result<Vec<Update>> {
        let body = json!({
            "offset": offset,
            "timeout": timeout.as_secs(),
            "allowed_updates": ["message"],
        });
        self.call("getUpdates", &body).await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str, parse_mode: Option<ParseMode>) -> Result<Message> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(mode) = parse_mode {
            body["parse_mode"] = serde_json::to_value(mode)?;
        }
        self.call("sendMessage", &body).await
    }

    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<bool> {
        self.call("deleteMessage", &json!({"chat_id": chat_id, "message_id": message_id}))
            .await
    }
}

fn unwrap_envelope<T>(method: &str, envelope: TelegramResponse<T>) -> Result<T> {
    if !envelope.ok {
        return Err(anyhow!(
            "Telegram {} rejected (code {}): {}",
            method,
            envelope.error_code.unwrap_or_default(),
            envelope.description.unwrap_or_else(|| "no description".to_string())
        ));
    }
    envelope
        .result
        .ok_or_else(|| anyhow!("Telegram {} returned ok without a result", method))
}

fn redact(text: &str, token: &str) -> String {
    if token.is_empty() {
        return text.to_string();
    }
    text.replace(token, "***")
}
