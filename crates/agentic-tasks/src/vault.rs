//! The vault — explicit owner of all shared state and background workers.
//!
//! Opening a vault loads the snapshot, builds the store, and starts the
//! persistence worker and the log flusher. Sessions borrow `Arc` handles
//! from it; nothing is global.
//!
//! Shutdown order matters: admission of new mutations closes, the
//! persistence worker is stopped and a final save runs, then the flusher is
//! stopped and the buffer drained, so every audit entry emitted up to the
//! call makes it to the log file. Sessions that outlive the vault can still
//! read but every mutation fails with `PersistenceUnavailable`.

use std::path::Path;
use std::sync::Arc;

use crate::audit::{ErrorSink, FlushStats, LogBuffer, LogFlusher};
use crate::config::VaultConfig;
use crate::error::{Result, TaskError};
use crate::persistence::{
    load_snapshot, PersistenceScheduler, SaveOutcome, SaveStats, SnapshotSource,
};
use crate::session::AccountSession;
use crate::store::GuardedStore;

/// What the orderly shutdown did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    pub save: SaveOutcome,
    pub lines_flushed: usize,
}

/// A running task store.
pub struct Vault {
    config: VaultConfig,
    store: Arc<GuardedStore>,
    log: Arc<LogBuffer>,
    errors: Arc<ErrorSink>,
    load_source: SnapshotSource,
    // Field order is drop order: save before the final log drain.
    scheduler: PersistenceScheduler,
    flusher: LogFlusher,
}

impl Vault {
    /// Load the snapshot named by `config` and start the background workers.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::PersistenceUnavailable` if an existing snapshot
    /// cannot be read, or `TaskError::Io` if a directory cannot be created
    /// or a worker cannot be spawned. A missing or corrupt snapshot is not
    /// an error.
    pub fn open(config: VaultConfig) -> Result<Self> {
        for path in [&config.data_path, &config.log_path, &config.error_log_path] {
            ensure_parent(path)?;
        }

        let errors = Arc::new(ErrorSink::new(&config.error_log_path));
        let loaded = load_snapshot(&config.data_path)?;
        if let SnapshotSource::Corrupt { preserved_as } = &loaded.source {
            let detail = match preserved_as {
                Some(p) => format!("unreadable snapshot moved to {}", p.display()),
                None => "unreadable snapshot could not be moved aside".to_string(),
            };
            errors.record("persistence", &TaskError::PersistenceUnavailable(detail));
        }

        let store = Arc::new(GuardedStore::from_accounts(loaded.accounts));
        let log = Arc::new(LogBuffer::new());

        let scheduler = PersistenceScheduler::spawn(
            Arc::clone(&store),
            &config.data_path,
            Arc::clone(&errors),
            config.autosave_interval,
        )?;
        let flusher = LogFlusher::spawn(
            Arc::clone(&log),
            &config.log_path,
            Arc::clone(&errors),
            config.flush_interval,
        )?;

        log::debug!(
            "vault opened: {} accounts from {} ({:?})",
            store.len(),
            config.data_path.display(),
            loaded.source
        );

        Ok(Self {
            config,
            store,
            log,
            errors,
            load_source: loaded.source,
            scheduler,
            flusher,
        })
    }

    /// A new unauthenticated session over this vault.
    pub fn session(&self) -> AccountSession {
        AccountSession::new(
            Arc::clone(&self.store),
            Arc::clone(&self.log),
            self.scheduler.handle(),
        )
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<GuardedStore> {
        &self.store
    }

    pub fn log(&self) -> &Arc<LogBuffer> {
        &self.log
    }

    pub fn errors(&self) -> &Arc<ErrorSink> {
        &self.errors
    }

    /// How the snapshot was found at open.
    pub fn load_source(&self) -> &SnapshotSource {
        &self.load_source
    }

    pub fn request_save(&self) {
        self.scheduler.request_save();
    }

    /// Synchronous save, serialized with the background worker.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::PersistenceUnavailable` if the write fails.
    pub fn save_now(&self) -> Result<SaveOutcome> {
        self.scheduler.save_now()
    }

    /// Synchronous log drain, serialized with the background flusher.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::LogUnavailable` if the log file cannot be
    /// written; entries stay buffered.
    pub fn flush_log(&self) -> Result<usize> {
        self.flusher.flush_now()
    }

    pub fn save_stats(&self) -> SaveStats {
        self.scheduler.stats()
    }

    pub fn flush_stats(&self) -> FlushStats {
        self.flusher.stats()
    }

    /// Stop both workers: final save, then final log drain.
    ///
    /// Both steps always run. If either fails, the first error is returned
    /// after the second step has completed.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::PersistenceUnavailable` or
    /// `TaskError::LogUnavailable` from the failing step.
    pub fn shutdown(mut self) -> Result<ShutdownReport> {
        let save = self.scheduler.shutdown();
        let drained = self.flusher.stop();
        log::debug!("vault shut down");

        let save = save?;
        let lines_flushed = drained?;
        Ok(ShutdownReport {
            save,
            lines_flushed,
        })
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent)?;
            Ok(())
        }
        _ => Ok(()),
    }
}
