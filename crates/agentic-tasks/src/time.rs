//! Time utilities for AgenticTasks.
//!
//! Audit and error-channel lines use local wall-clock time in the
//! `DD.MM.YYYY HH:MM:SS` layout.

use chrono::{DateTime, Local};

/// `strftime` layout used for every human-readable log timestamp.
pub const LOG_TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Return the current time as microseconds since Unix epoch.
pub fn now_micros() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// Format a local timestamp as `DD.MM.YYYY HH:MM:SS`.
pub fn format_log_timestamp(at: &DateTime<Local>) -> String {
    at.format(LOG_TIMESTAMP_FORMAT).to_string()
}
