//! Command parsing and reply building. Network free: quotes come from any
//! [`QuoteSource`], replies are returned rather than sent.

use crate::price_logic::format::{format_multiple, format_single};
use crate::price_logic::telegram::ParseMode;
use lib_common::markets::coinmarketcap::QuoteSource;

pub const START_TEXT: &str = "👋 Hi! I am a cryptocurrency quotes bot.\n\n\
Available commands:\n\
/price <symbol> - get the price of a cryptocurrency (e.g. /price BTC)\n\
/price <symbol1,symbol2,...> - get prices of several cryptocurrencies (e.g. /price BTC,ETH,BNB)\n\
/help - show this help";

pub const HELP_TEXT: &str = "📖 Command help:\n\n\
/price <symbol> - get the price of one cryptocurrency\n\
Example: /price BTC\n\n\
/price <symbol1,symbol2,...> - get prices of several cryptocurrencies\n\
Example: /price BTC,ETH,BNB\n\n\
/help - show this help";

pub const USAGE_TEXT: &str = "❌ Please specify cryptocurrency symbol(s).\nExample: /price BTC or /price BTC,ETH,BNB";

pub const LOADING_TEXT: &str = "⏳ Loading data...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    /// Everything after the command word, trimmed. May be empty.
    Price(String),
}

impl Command {
    /// Recognises `/start`, `/help` and `/price`, with or without a
    /// `@BotName` suffix. Anything else is not a command for this bot.
    pub fn parse(text: &str) -> Option<Command> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;

        let (head, payload) = match rest.split_once(char::is_whitespace) {
            Some((head, payload)) => (head, payload.trim()),
            None => (rest, ""),
        };
        let name = head.split('@').next().unwrap_or(head).to_lowercase();

        match name.as_str() {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            "price" => Some(Command::Price(payload.to_string())),
            _ => None,
        }
    }

    /// `true` when answering means calling the quote source.
    pub fn needs_quotes(&self) -> bool {
        matches!(self, Command::Price(payload) if !payload.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub parse_mode: Option<ParseMode>,
}

impl Reply {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            parse_mode: None,
        }
    }
}

pub async fn respond<Q: QuoteSource>(command: &Command, source: &Q) -> Reply {
    match command {
        Command::Start => Reply::plain(START_TEXT),
        Command::Help => Reply::plain(HELP_TEXT),
        Command::Price(payload) if payload.is_empty() => Reply::plain(USAGE_TEXT),
        Command::Price(payload) => match source.get_quotes(payload).await {
            Ok(records) => {
                log::info!("Fetched {} quotes for: {}", records.len(), payload);
                let text = if records.len() == 1 {
                    format_single(&records[0])
                } else {
                    format_multiple(&records)
                };
                Reply {
                    text,
                    parse_mode: Some(ParseMode::Markdown),
                }
            }
            Err(e) => {
                log::error!("Quote lookup failed for {}: {}", payload, e);
                Reply::plain(&format!("❌ Failed to fetch data: {}", e))
            }
        },
    }
}
