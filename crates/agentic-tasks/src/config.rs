//! Vault configuration — file locations and background cadences.
//!
//! ```text
//! {dir}/
//! ├── users_data.json   — account snapshot, rewritten wholesale
//! ├── app.log           — append-only audit log
//! └── errors.log        — infrastructure failures (side channel)
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

// ── Defaults ──────────────────────────────────────────────────────────────────

pub const DEFAULT_DATA_FILE: &str = "users_data.json";
pub const DEFAULT_LOG_FILE: &str = "app.log";
pub const DEFAULT_ERROR_LOG_FILE: &str = "errors.log";

/// Periodic safety-net save cadence.
pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(10);

/// Audit log drain cadence.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(3);

// ── VaultConfig ───────────────────────────────────────────────────────────────

/// Paths and intervals used to open a [`crate::Vault`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultConfig {
    /// Account snapshot file.
    pub data_path: PathBuf,
    /// Audit log file.
    pub log_path: PathBuf,
    /// Error channel file for background failures.
    pub error_log_path: PathBuf,
    /// How often the persistence worker saves without an explicit request.
    pub autosave_interval: Duration,
    /// How often the log flusher drains the buffer.
    pub flush_interval: Duration,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_FILE),
            log_path: PathBuf::from(DEFAULT_LOG_FILE),
            error_log_path: PathBuf::from(DEFAULT_ERROR_LOG_FILE),
            autosave_interval: DEFAULT_AUTOSAVE_INTERVAL,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

impl VaultConfig {
    /// Root all three files under `dir` with their default names.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            data_path: dir.join(DEFAULT_DATA_FILE),
            log_path: dir.join(DEFAULT_LOG_FILE),
            error_log_path: dir.join(DEFAULT_ERROR_LOG_FILE),
            ..Self::default()
        }
    }

    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }

    pub fn with_error_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.error_log_path = path.into();
        self
    }

    /// Zero intervals are clamped to 10ms so the workers never spin.
    pub fn with_autosave_interval(mut self, interval: Duration) -> Self {
        self.autosave_interval = interval.max(MIN_INTERVAL);
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval.max(MIN_INTERVAL);
        self
    }
}

const MIN_INTERVAL: Duration = Duration::from_millis(10);
