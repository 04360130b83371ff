//! Audit log entries and their one-line text form.

use chrono::{DateTime, Local};

use crate::time::format_log_timestamp;

/// Severity of an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Error,
}

impl LogLevel {
    /// Return the stable upper-case tag written to the log file.
    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// One audit event, timestamped when it was appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Local>,
    pub identifier: String,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Local::now(),
            identifier: identifier.into(),
            message: message.into(),
        }
    }

    /// `[LEVEL] [DD.MM.YYYY HH:MM:SS] [identifier] - message`, no newline.
    pub fn format_line(&self) -> String {
        format!(
            "[{}] [{}] [{}] - {}",
            self.level,
            format_log_timestamp(&self.timestamp),
            self.identifier,
            self.message
        )
    }
}
