use crate::price_logic::commands::{respond, Command, LOADING_TEXT};
use crate::price_logic::telegram::{TelegramApi, Update};
use lib_common::markets::coinmarketcap::QuoteSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::sleep;

const ERROR_BACKOFF_BASE: Duration = Duration::from_secs(1);
const ERROR_BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Long-polls Telegram until shutdown, handling each update on its own task.
pub async fn run<Q>(
    api: Arc<TelegramApi>,
    source: Arc<Q>,
    poll_timeout: Duration,
    mut shutdown: broadcast::Receiver<()>,
) where
    Q: QuoteSource + 'static,
{
    let mut offset: Option<i64> = None;
    let mut consecutive_errors: u32 = 0;

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                log::info!("Poller received shutdown signal.");
                break;
            }
            result = api.get_updates(offset, poll_timeout) => match result {
                Ok(updates) => {
                    consecutive_errors = 0;
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        tokio::spawn(handle_update(Arc::clone(&api), Arc::clone(&source), update));
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;
                    let delay = backoff(consecutive_errors);
                    log::error!("getUpdates failed (attempt {}): {}. Retrying in {:?}", consecutive_errors, e, delay);
                    tokio::select! {
                        _ = shutdown.recv() => {
                            log::info!("Poller received shutdown signal during backoff.");
                            break;
                        }
                        _ = sleep(delay) => {}
                    }
                }
            }
        }
    }
}

fn backoff(consecutive_errors: u32) -> Duration {
    let factor = 2u32.saturating_pow(consecutive_errors.saturating_sub(1));
    ERROR_BACKOFF_BASE.saturating_mul(factor).min(ERROR_BACKOFF_MAX)
}

async fn handle_update<Q: QuoteSource>(api: Arc<TelegramApi>, source: Arc<Q>, update: Update) {
    let Some(message) = update.message else {
        return;
    };
    let Some(command) = message.text.as_deref().and_then(Command::parse) else {
        return;
    };

    let chat_id = message.chat.id;
    let (user_id, username) = message
        .from
        .as_ref()
        .map(|u| (u.id, u.username.clone().unwrap_or_default()))
        .unwrap_or_default();
    log::info!("User {} (@{}) sent {:?}", user_id, username, command);

    let placeholder = if command.needs_quotes() {
        match api.send_message(chat_id, LOADING_TEXT, None).await {
            Ok(sent) => Some(sent),
            Err(e) => {
                log::warn!("Failed to send loading message to chat {}: {}", chat_id, e);
                None
            }
        }
    } else {
        None
    };

    let reply = respond(&command, source.as_ref()).await;

    if let Some(sent) = placeholder {
        if let Err(e) = api.delete_message(chat_id, sent.message_id).await {
            log::warn!("Failed to delete loading message in chat {}: {}", chat_id, e);
        }
    }

    if let Err(e) = api.send_message(chat_id, &reply.text, reply.parse_mode).await {
        log::error!("Failed to send reply to user {} (@{}): {}", user_id, username, e);
    }
}
