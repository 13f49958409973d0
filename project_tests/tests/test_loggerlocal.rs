//! # LoggerLocal Integration Test
//!
//! File logging into a temporary directory: entries and their structured
//! extras land in the file, levels outside the configured set are dropped,
//! and a second logger for the same app rotates the older file away.

use lib_common::loggers::loggerlocal::{LoggerLocal, LoggerLocalOptions};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn log_files(dir: &std::path::Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .expect("Failed to read log directory")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "log"))
        .collect();
    files.sort();
    files
}

#[tokio::test]
async fn test_file_logging_writes_messages_and_extras() {
    let temp_dir = tempdir().expect("Failed to create temporary directory");
    let options = LoggerLocalOptions {
        use_tty: None,
        use_file: Some(vec![2, 3, 4, 5, 6]),
        log_dir: Some(temp_dir.path().to_path_buf()),
    };
    let logger = LoggerLocal::new("cmc_client".to_string(), Some(options));

    logger.info("Fetching quotes", Some(json!({"symbols": "BTC,ETH"}))).await;
    logger.warn("Dropping symbol without USD quote", Some(json!({"symbol": "XYZ", "id": 42}))).await;
    logger.error("Quote request failed", None).await;
    logger.debug("Selected listing", None).await;
    logger.trace("Not configured for file output", None).await;

    let files = log_files(temp_dir.path());
    assert_eq!(files.len(), 1, "expected exactly one log file");
    assert_eq!(logger.log_file(), Some(files[0].as_path()));

    let contents = fs::read_to_string(&files[0]).expect("Failed to read log file contents");
    assert!(contents.contains("[cmc_client] [INFO] Fetching quotes"));
    assert!(contents.contains(r#""symbols":"BTC,ETH""#));
    assert!(contents.contains("[WARN] Dropping symbol without USD quote"));
    assert!(contents.contains(r#""id":42"#));
    assert!(contents.contains("[ERROR] Quote request failed"));
    assert!(contents.contains("[DEBUG] Selected listing"));
    assert!(!contents.contains("Not configured for file output"));
}

#[tokio::test]
async fn test_new_logger_rotates_previous_file() {
    let temp_dir = tempdir().expect("Failed to create temporary directory");
    let log_dir = temp_dir.path().to_path_buf();

    // Stale file from an earlier run; timestamped names sort chronologically
    let stale = log_dir.join("cmc_client-20000101_000000.log");
    fs::write(&stale, "old entry\n").expect("Failed to seed stale log file");
    // Another app's file is left alone
    let foreign = log_dir.join("bot_price_20000101_000000.log");
    fs::write(&foreign, "other app\n").expect("Failed to seed foreign log file");

    let logger = LoggerLocal::new(
        "cmc_client".to_string(),
        Some(LoggerLocalOptions {
            use_tty: None,
            use_file: Some(vec![3]),
            log_dir: Some(log_dir.clone()),
        }),
    );
    logger.info("fresh entry", None).await;

    // The freshly created file replaces the stale one on the next start
    let second = LoggerLocal::new(
        "cmc_client".to_string(),
        Some(LoggerLocalOptions {
            use_tty: None,
            use_file: Some(vec![3]),
            log_dir: Some(log_dir.clone()),
        }),
    );

    assert!(!stale.exists(), "stale log file should have been rotated away");
    assert!(foreign.exists(), "logs of other apps must survive rotation");
    let remaining: Vec<PathBuf> = log_files(&log_dir)
        .into_iter()
        .filter(|p| p.file_name().is_some_and(|n| n.to_string_lossy().starts_with("cmc_client-")))
        .collect();
    assert_eq!(remaining.len(), 1, "expected one cmc_client log, found {:?}", remaining);
    assert!(second.log_file().is_some());
}
