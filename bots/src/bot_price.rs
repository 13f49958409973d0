use anyhow::Result;
use lib_common::loggers::loggerlocal::{LoggerLocal, LoggerLocalOptions};
use lib_common::loggers::logrecord::ALL_LEVELS;
use lib_common::markets::coinmarketcap::CoinMarketCap;
use std::sync::Arc;
use tokio::signal;

mod price_logic;
use price_logic::{config, logger, poller, telegram::TelegramApi};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; real deployments set the environment directly
    let _ = dotenvy::dotenv();

    let config = config::load_config();
    let settings = match config.validate() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("FATAL: {}", e);
            std::process::exit(1);
        }
    };

    logger::setup_logging(&settings.log_dir, &settings.log_level)?;

    let min_level = logger::local_level(&settings.log_level);
    let levels: Vec<i64> = ALL_LEVELS.iter().copied().filter(|l| *l >= min_level).collect();
    let core_logger = Arc::new(LoggerLocal::new(
        "cmc_client".to_string(),
        Some(LoggerLocalOptions {
            use_tty: Some(levels.clone()),
            use_file: Some(levels),
            log_dir: Some(settings.log_dir.clone()),
        }),
    ));

    let quotes = Arc::new(CoinMarketCap::with_base_url(
        &settings.cmc_base_url,
        &settings.cmc_api_key,
        Arc::clone(&core_logger),
    )?);
    let api = Arc::new(TelegramApi::new(
        &settings.telegram_api_url,
        &settings.bot_token,
        settings.poll_timeout,
    )?);

    let me = api.get_me().await?;
    log::info!(
        "Bot @{} ({}) started and ready.",
        me.username.as_deref().unwrap_or("unknown"),
        me.first_name
    );

    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
    let poller_handle = tokio::spawn(poller::run(
        Arc::clone(&api),
        quotes,
        settings.poll_timeout,
        shutdown_tx.subscribe(),
    ));

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut term_signal) => {
                        term_signal.recv().await;
                        log::info!("SIGTERM received, initiating shutdown.");
                    }
                    Err(e) => {
                        log::warn!("Could not install SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                // On non-unix platforms, just wait forever.
                std::future::pending::<()>().await;
            }
        } => {}
    }

    // Send shutdown signal to the poller
    let _ = shutdown_tx.send(());
    let _ = poller_handle.await;

    log::info!("Shutdown complete.");
    Ok(())
}
