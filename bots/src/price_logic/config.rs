use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CMC_BASE_URL: &str = "https://pro-api.coinmarketcap.com/v2";
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_CONFIG_FILE: &str = "bot_price.conf";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} is not set. Set the environment variable.")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[command(about = "Telegram bot serving CoinMarketCap price quotes", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true, help = "Telegram bot authentication token.")]
    pub bot_token: Option<String>,

    #[arg(long, env = "COINMARKETCAP_API_KEY", hide_env_values = true, help = "CoinMarketCap Pro API key.")]
    pub cmc_api_key: Option<String>,

    #[arg(long, env = "COINMARKETCAP_BASE_URL", help = "CoinMarketCap API base URL.")]
    pub cmc_base_url: Option<String>,

    #[arg(long, env = "TELEGRAM_API_URL", help = "Telegram Bot API root URL.")]
    pub telegram_api_url: Option<String>,

    #[arg(long, env = "BOT_POLL_TIMEOUT_SECONDS", help = "Long polling timeout for getUpdates, in seconds.")]
    pub poll_timeout_seconds: Option<u64>,

    #[arg(long, env = "BOT_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[arg(long, env = "BOT_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[arg(long, env = "BOT_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,
}

/// Validated settings the bot runs with.
#[derive(Debug, Clone)]
pub struct BotSettings {
    pub bot_token: String,
    pub cmc_api_key: String,
    pub cmc_base_url: String,
    pub telegram_api_url: String,
    pub poll_timeout: Duration,
    pub log_dir: PathBuf,
    pub log_level: String,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            bot_token: other.bot_token.or(self.bot_token),
            cmc_api_key: other.cmc_api_key.or(self.cmc_api_key),
            cmc_base_url: other.cmc_base_url.or(self.cmc_base_url),
            telegram_api_url: other.telegram_api_url.or(self.telegram_api_url),
            poll_timeout_seconds: other.poll_timeout_seconds.or(self.poll_timeout_seconds),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
        }
    }

    pub fn defaults() -> Config {
        Config {
            cmc_base_url: Some(DEFAULT_CMC_BASE_URL.to_string()),
            telegram_api_url: Some(DEFAULT_TELEGRAM_API_URL.to_string()),
            poll_timeout_seconds: Some(10),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            ..Default::default()
        }
    }

    /// Checks the required values and fills in the rest.
    pub fn validate(&self) -> Result<BotSettings, ConfigError> {
        let bot_token = required(&self.bot_token, "TELEGRAM_BOT_TOKEN")?;
        let cmc_api_key = required(&self.cmc_api_key, "COINMARKETCAP_API_KEY")?;

        let poll_timeout_seconds = self.poll_timeout_seconds.unwrap_or(10);
        if poll_timeout_seconds == 0 || poll_timeout_seconds > 50 {
            return Err(ConfigError::InvalidValue {
                name: "BOT_POLL_TIMEOUT_SECONDS".to_string(),
                reason: format!("{} is outside 1..=50", poll_timeout_seconds),
            });
        }

        Ok(BotSettings {
            bot_token,
            cmc_api_key,
            cmc_base_url: self.cmc_base_url.clone().unwrap_or_else(|| DEFAULT_CMC_BASE_URL.to_string()),
            telegram_api_url: self
                .telegram_api_url
                .clone()
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string()),
            poll_timeout: Duration::from_secs(poll_timeout_seconds),
            log_dir: self.log_dir.clone().unwrap_or_else(|| PathBuf::from("./logs")),
            log_level: self.log_level.clone().unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn required(value: &Option<String>, name: &str) -> Result<String, ConfigError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ConfigError::MissingEnvVar(name.to_string())),
    }
}

/// Layers defaults, the optional JSON file and CLI/env values, in that order.
pub fn resolve_config(cli_args: Config) -> Config {
    let config_file_path = cli_args
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut current_config = Config::defaults();

    // Logging is not up yet, so problems go to stderr
    if config_file_path.exists() {
        match fs::read_to_string(&config_file_path) {
            Ok(config_str) => match serde_json::from_str::<Config>(&config_str) {
                Ok(file_config) => current_config = current_config.merge(file_config),
                Err(e) => eprintln!(
                    "Failed to parse config file {}: {}. Falling back to other sources.",
                    config_file_path.display(),
                    e
                ),
            },
            Err(e) => eprintln!(
                "Failed to read config file {}: {}. Falling back to other sources.",
                config_file_path.display(),
                e
            ),
        }
    }

    current_config.merge(cli_args)
}

pub fn load_config() -> Config {
    resolve_config(Config::parse())
}
