use super::logrecord::{level_name, Logrecord, ALL_LEVELS};
use chrono::Local;
use colored::*;
use glob::glob;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
/// # Logger Local Options
///
/// Configuration options for the `LoggerLocal` instance, controlling where and how
/// log messages are output.
pub struct LoggerLocalOptions {
    /// A list of log levels that should be printed to the TTY (console).
    pub use_tty: Option<Vec<i64>>,
    /// A list of log levels that should be written to a log file.
    pub use_file: Option<Vec<i64>>,
    /// The directory where log files should be stored. If `None`, defaults to `./logs`.
    pub log_dir: Option<PathBuf>,
}

impl LoggerLocalOptions {
    /// Console output at `min_level` and above, no file.
    pub fn tty_from(min_level: i64) -> Self {
        Self {
            use_tty: Some(ALL_LEVELS.iter().copied().filter(|l| *l >= min_level).collect()),
            use_file: None,
            log_dir: None,
        }
    }

    /// Drops everything. Handy for tests that only care about return values.
    pub fn silent() -> Self {
        Self::default()
    }
}

/// # Logger Local
///
/// An async, cheaply shareable (`Arc<LoggerLocal>`) structured logger. Each
/// entry is a [`Logrecord`]; the TTY gets a coloured two-line rendering and
/// the log file gets one line per entry followed by the JSON tags.
pub struct LoggerLocal {
    /// The name of the application associated with this logger instance.
    app_name: String,
    /// Configuration options determining logging behavior.
    options: LoggerLocalOptions,
    /// Serialises appends so concurrent tasks never interleave partial lines.
    file_mutex: Mutex<()>,
    /// The path to the currently active log file, if file logging is enabled.
    current_log_file: Option<PathBuf>,
}

impl LoggerLocal {
    /// Rotates log files for a given application and log directory.
    ///
    /// Keeps only the most recent log file (timestamped filenames sort
    /// chronologically) and deletes older ones.
    fn rotate_logs(app_name: &str, log_dir: &Path) {
        let pattern = format!("{}/{}-*.log", log_dir.display(), app_name);
        let mut log_files: Vec<PathBuf> = match glob(&pattern) {
            Ok(paths) => paths.filter_map(Result::ok).collect(),
            Err(e) => {
                eprintln!("Invalid glob pattern for log rotation {}: {}", pattern, e);
                return;
            }
        };

        // Newest first
        log_files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

        for old_file in log_files.iter().skip(1) {
            if let Err(e) = std::fs::remove_file(old_file) {
                eprintln!("Error deleting old log file {}: {}", old_file.display(), e);
            }
        }
    }

    /// Creates a new `LoggerLocal` instance.
    ///
    /// If file logging is enabled, it ensures the log directory exists,
    /// rotates old logs, and sets up the current log file path.
    ///
    /// # Arguments
    /// * `app_name` - The name of the application using this logger.
    /// * `options` - Optional `LoggerLocalOptions`. If `None`, every level goes
    ///   to the TTY and nothing is written to disk.
    pub fn new(app_name: String, options: Option<LoggerLocalOptions>) -> Self {
        let opts = options.unwrap_or_else(|| LoggerLocalOptions::tty_from(0));

        let mut logger = Self {
            app_name: app_name.clone(),
            options: opts,
            file_mutex: Mutex::new(()),
            current_log_file: None,
        };

        if logger.options.use_file.is_some() {
            let log_base_dir = logger
                .options
                .log_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from("./logs"));

            if let Err(e) = std::fs::create_dir_all(&log_base_dir) {
                eprintln!("Error creating log directory {}: {}", log_base_dir.display(), e);
            }

            LoggerLocal::rotate_logs(&app_name, &log_base_dir);

            let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
            let current_log_filename = format!("{}-{}.log", app_name, timestamp);
            logger.current_log_file = Some(log_base_dir.join(current_log_filename));
        }

        logger
    }

    /// The file entries are appended to, if file logging is enabled.
    pub fn log_file(&self) -> Option<&Path> {
        self.current_log_file.as_deref()
    }

    /// Asynchronously logs a message with a specified level, handling TTY
    /// output and file writing based on the logger's configuration.
    ///
    /// # Arguments
    /// * `log_level` - The numeric log level (0 for Silly .. 6 for Fatal).
    /// * `log_message` - The main message string to be logged.
    /// * `log_extras` - Additional structured data to include in the log.
    pub async fn log(&self, log_level: i64, log_message: &str, log_extras: Option<Value>) {
        let record = Logrecord::new(&self.app_name, log_level, log_message, log_extras);

        if let Some(tty_levels) = &self.options.use_tty {
            if tty_levels.contains(&log_level) {
                self.print_tty(&record);
            }
        }

        if let Some(file_levels) = &self.options.use_file {
            if file_levels.contains(&log_level) {
                self.append_file(&record).await;
            }
        }
    }

    fn print_tty(&self, record: &Logrecord) {
        let ts = record.ts.as_str().truecolor(128, 128, 128);
        let app_name_colored = format!("[{}]", self.app_name).truecolor(128, 128, 128);
        let text = record.message.text.as_str();

        let colored_message = match record.loglevel {
            6 => text.bright_white().on_bright_red(), // Fatal
            5 => text.bright_red(),                   // Error
            4 => text.bright_yellow(),                // Warn
            3 => text.bright_green(),                 // Info
            2 => text.bright_white(),                 // Debug
            1 => text.bright_cyan(),                  // Trace
            _ => text.blue(),                         // Silly
        };

        println!("{}{}\n{}", ts, app_name_colored, colored_message);
        if record.has_tags() {
            if let Ok(tags_str) = serde_json::to_string(&record.tags) {
                println!("{}{}{}", ts, app_name_colored, tags_str.truecolor(128, 128, 128));
            }
        }
    }

    async fn append_file(&self, record: &Logrecord) {
        let Some(log_file_path) = &self.current_log_file else {
            return;
        };

        let mut line = format!(
            "{} [{}] [{}] {}\n",
            record.ts,
            self.app_name,
            level_name(record.loglevel),
            record.message.text
        );
        if record.has_tags() {
            if let Ok(tags_str) = serde_json::to_string(&record.tags) {
                line.push_str(&tags_str);
                line.push('\n');
            }
        }

        let _guard = self.file_mutex.lock().await;
        let written = async {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file_path)
                .await?;
            file.write_all(line.as_bytes()).await?;
            // Data is on disk once the call returns
            file.flush().await
        }
        .await;
        if let Err(e) = written {
            eprintln!("Error writing log file {}: {}", log_file_path.display(), e);
        }
    }

    /// Logs a message at the "Silly" (level 0) log level.
    pub async fn silly(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(0, log_message, log_extras).await;
    }

    /// Logs a message at the "Trace" (level 1) log level.
    pub async fn trace(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(1, log_message, log_extras).await;
    }

    /// Logs a message at the "Debug" (level 2) log level.
    ///
    /// The quote normalizer reports which listing it picked for each symbol
    /// here.
    pub async fn debug(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(2, log_message, log_extras).await;
    }

    /// Logs a message at the "Info" (level 3) log level.
    pub async fn info(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(3, log_message, log_extras).await;
    }

    /// Logs a message at the "Warn" (level 4) log level.
    ///
    /// Indicates an unusual event that does not stop the current operation,
    /// such as a symbol dropped from a quote response.
    pub async fn warn(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(4, log_message, log_extras).await;
    }

    /// Logs a message at the "Error" (level 5) log level.
    pub async fn error(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(5, log_message, log_extras).await;
    }

    /// Logs a message at the "Fatal" (level 6) log level.
    pub async fn fatal(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(6, log_message, log_extras).await;
    }
}
