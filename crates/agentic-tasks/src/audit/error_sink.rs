//! Side channel for background infrastructure failures.
//!
//! Workers never propagate a failed write to the foreground. They hand the
//! error to the sink, which mirrors it to the `log` facade and appends a
//! line to a dedicated error file:
//!
//! ```text
//! [DD.MM.YYYY HH:MM:SS] [component] - error text
//! ```

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Local;
use parking_lot::Mutex;

use crate::error::TaskError;
use crate::time::format_log_timestamp;

/// Records infrastructure errors raised by background workers.
pub struct ErrorSink {
    path: PathBuf,
    count: AtomicU64,
    last: Mutex<Option<String>>,
}

impl ErrorSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            count: AtomicU64::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record one failure. Never fails; if the error file itself cannot be
    /// written the failure is only reported through `log`.
    pub fn record(&self, component: &str, err: &TaskError) {
        let text = err.to_string();
        log::error!("{component}: {text}");

        let line = format!(
            "[{}] [{}] - {}\n",
            format_log_timestamp(&Local::now()),
            component,
            text
        );

        // Holding `last` serializes writers to the error file.
        let mut last = self.last.lock();
        if let Err(io) = append(&self.path, line.as_bytes()) {
            log::error!(
                "error channel {} unavailable: {io}; dropped: {}",
                self.path.display(),
                line.trim_end()
            );
        }
        *last = Some(text);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of failures recorded since start.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Text of the most recent failure.
    pub fn last_error(&self) -> Option<String> {
        self.last.lock().clone()
    }
}

fn append(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(bytes)
}
