/// Defines the data structures and numeric levels for log records.
pub mod logrecord;
/// Implements a local logger with support for TTY and file output.
pub mod loggerlocal;
