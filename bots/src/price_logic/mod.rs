pub mod commands;
pub mod config;
pub mod format;
pub mod logger;
pub mod poller;
pub mod telegram;
#[cfg(test)]
pub mod testkit;
