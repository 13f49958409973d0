use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Numeric log levels shared by every logger in the workspace.
pub const LEVEL_SILLY: i64 = 0;
pub const LEVEL_TRACE: i64 = 1;
pub const LEVEL_DEBUG: i64 = 2;
pub const LEVEL_INFO: i64 = 3;
pub const LEVEL_WARN: i64 = 4;
pub const LEVEL_ERROR: i64 = 5;
pub const LEVEL_FATAL: i64 = 6;

/// Every level, lowest first.
pub const ALL_LEVELS: [i64; 7] = [
    LEVEL_SILLY,
    LEVEL_TRACE,
    LEVEL_DEBUG,
    LEVEL_INFO,
    LEVEL_WARN,
    LEVEL_ERROR,
    LEVEL_FATAL,
];

/// Short upper-case label for a numeric level.
pub fn level_name(level: i64) -> &'static str {
    match level {
        LEVEL_SILLY => "SILLY",
        LEVEL_TRACE => "TRACE",
        LEVEL_DEBUG => "DEBUG",
        LEVEL_INFO => "INFO",
        LEVEL_WARN => "WARN",
        LEVEL_ERROR => "ERROR",
        _ => "FATAL",
    }
}

/// # Logrecord
///
/// A single structured log entry. `tags` carries the free-form context a
/// call site attaches (status codes, URLs, counts) and is `[]` when empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Logrecord {
    /// RFC 3339 timestamp (UTC, millisecond precision).
    pub ts: String,
    /// The severity level (0 Silly .. 6 Fatal).
    pub loglevel: i64,
    /// Details about the message content.
    pub message: Message,
    /// Information about the application generating the log.
    pub app: App,
    /// Flexible JSON value for arbitrary tags or additional metadata.
    pub tags: Value,
}

impl Logrecord {
    /// Builds a record stamped with the current time.
    pub fn new(app_name: &str, loglevel: i64, text: &str, tags: Option<Value>) -> Self {
        Self {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            loglevel,
            message: Message {
                text: text.to_string(),
                ..Message::default()
            },
            app: App {
                name: app_name.to_string(),
                ..App::default()
            },
            tags: tags.unwrap_or_else(|| serde_json::json!([])),
        }
    }

    /// `true` when the call site attached any context.
    pub fn has_tags(&self) -> bool {
        self.tags != serde_json::json!([]) && !self.tags.is_null()
    }
}

/// # Message
///
/// Represents the textual content of a log entry, including its language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The language of the message (e.g., "en" for English).
    pub lang: String,
    /// The actual text content of the message.
    pub text: String,
}
impl Default for Message {
    fn default() -> Self {
        Self {
            text: "".to_string(),
            lang: "en".to_string(),
        }
    }
}

/// # App
///
/// Contains information about the application that generated the log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct App {
    /// The process ID (PID) of the application.
    pub pid: i64,
    /// The name of the application.
    pub name: String,
}
impl Default for App {
    fn default() -> Self {
        Self {
            name: String::new(),
            pid: std::process::id() as i64,
        }
    }
}
