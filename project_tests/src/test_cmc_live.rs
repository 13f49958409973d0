//! # CoinMarketCap Live Quote Test
//!
//! Calls the real quotes endpoint through lib_common and prints the
//! normalized records. Needs `COINMARKETCAP_API_KEY`; symbols come from the
//! first argument (default `BTC,ETH`).

use lib_common::loggers::loggerlocal::LoggerLocal;
use lib_common::markets::coinmarketcap::CoinMarketCap;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let _ = dotenvy::dotenv();

    let Ok(api_key) = std::env::var("COINMARKETCAP_API_KEY") else {
        eprintln!("[ERROR] COINMARKETCAP_API_KEY is not set");
        std::process::exit(1);
    };
    let symbols = std::env::args().nth(1).unwrap_or_else(|| "BTC,ETH".to_string());

    let logger = Arc::new(LoggerLocal::new("cmc_live_test".to_string(), None));
    let client = CoinMarketCap::new(&api_key, logger)?;

    println!("[*] Requesting live quotes for {} ...", symbols);

    match client.get_quotes(&symbols).await {
        Ok(records) => {
            println!("\n[SUCCESS] {} record(s) received:", records.len());
            println!("-----------------------------------------------");
            println!("{}", serde_json::to_string_pretty(&records)?);
            println!("-----------------------------------------------");
        }
        Err(e) => {
            eprintln!("\n[ERROR] Quote retrieval failed:");
            eprintln!(">>> {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
