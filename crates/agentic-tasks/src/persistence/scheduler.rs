//! Debounced, serialized snapshot writer.
//!
//! A single long-lived worker owns all background writes to the snapshot
//! file. Callers signal it with [`SaveHandle::request_save`], which only
//! sets a pending flag and notifies a condvar; any number of requests made
//! while a write is in flight collapse into one follow-up write.
//!
//! Independently of requests the worker saves every `autosave_interval`,
//! skipping the write when nothing changed since the last successful save.
//!
//! Every save (worker or explicit) holds `write_state` across both the
//! snapshot capture and the file write. Snapshots therefore reach the disk
//! in generation order and two writers never overlap.
//!
//! Mutations are admitted through [`SaveHandle::admit`]. Shutdown closes
//! admission first and waits for admitted mutations to finish, so the
//! final save covers every mutation that was reported as successful.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock, RwLockReadGuard};

use super::snapshot_file::write_snapshot;
use crate::audit::ErrorSink;
use crate::error::{Result, TaskError};
use crate::store::GuardedStore;

const COMPONENT: &str = "persistence";

/// What a single save attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A snapshot of this generation is now on disk.
    Written { generation: u64 },
    /// Periodic save skipped: the disk already holds this generation.
    Unchanged { generation: u64 },
}

/// Counters exposed for monitoring and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveStats {
    /// `request_save` calls.
    pub requests: u64,
    pub writes: u64,
    /// Periodic saves skipped because nothing changed.
    pub skipped: u64,
    pub failures: u64,
}

#[derive(Default)]
struct Control {
    pending: bool,
    stopping: bool,
}

struct WriteState {
    /// Generation of the snapshot currently on disk, if known.
    persisted: Option<u64>,
}

struct SchedulerShared {
    store: Arc<GuardedStore>,
    path: PathBuf,
    errors: Arc<ErrorSink>,
    autosave_interval: Duration,
    control: Mutex<Control>,
    wake: Condvar,
    write_state: Mutex<WriteState>,
    /// `true` once shutdown has begun.
    closed: RwLock<bool>,
    requests: AtomicU64,
    writes: AtomicU64,
    skipped: AtomicU64,
    failures: AtomicU64,
}

impl SchedulerShared {
    fn request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.control.lock().pending = true;
        self.wake.notify_one();
    }

    /// Capture and write one snapshot. With `force == false` the write is
    /// skipped when the disk already holds the current generation.
    fn save(&self, force: bool) -> Result<SaveOutcome> {
        let mut write_state = self.write_state.lock();
        let snapshot = self.store.snapshot()?;

        if !force && write_state.persisted == Some(snapshot.generation) {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            return Ok(SaveOutcome::Unchanged {
                generation: snapshot.generation,
            });
        }

        if let Err(e) = write_snapshot(&self.path, &snapshot.document) {
            self.failures.fetch_add(1, Ordering::Relaxed);
            return Err(TaskError::PersistenceUnavailable(format!(
                "{}: {e}",
                self.path.display()
            )));
        }

        write_state.persisted = Some(snapshot.generation);
        self.writes.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "saved generation {} ({} accounts) to {}",
            snapshot.generation,
            snapshot.account_count,
            self.path.display()
        );
        Ok(SaveOutcome::Written {
            generation: snapshot.generation,
        })
    }

    fn run(&self) {
        let mut next_autosave = Instant::now() + self.autosave_interval;
        loop {
            let explicit = {
                let mut control = self.control.lock();
                while !control.pending && !control.stopping && Instant::now() < next_autosave {
                    self.wake.wait_until(&mut control, next_autosave);
                }
                if control.stopping {
                    break;
                }
                std::mem::take(&mut control.pending)
            };

            let periodic = Instant::now() >= next_autosave;
            if periodic {
                next_autosave = Instant::now() + self.autosave_interval;
            }

            if let Err(err) = self.save(explicit) {
                self.errors.record(COMPONENT, &err);
            }
        }
        log::debug!("persistence worker exited");
    }
}

/// Cheap cloneable handle for raising save requests.
#[derive(Clone)]
pub struct SaveHandle {
    shared: Arc<SchedulerShared>,
}

/// Keeps shutdown from starting while held.
pub struct SavePermit<'a> {
    _open: RwLockReadGuard<'a, bool>,
}

impl SaveHandle {
    /// Ask for the store to be written. Never blocks on I/O.
    pub fn request_save(&self) {
        self.shared.request();
    }

    /// Admit one mutation. Hold the permit until the mutation and its
    /// save request are done.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::PersistenceUnavailable` once shutdown has begun;
    /// a mutation made then would never be saved.
    pub fn admit(&self) -> Result<SavePermit<'_>> {
        let closed = self.shared.closed.read();
        if *closed {
            return Err(TaskError::PersistenceUnavailable(format!(
                "writer for {} is shut down",
                self.shared.path.display()
            )));
        }
        Ok(SavePermit { _open: closed })
    }

    pub fn is_closed(&self) -> bool {
        *self.shared.closed.read()
    }
}

/// Owns the persistence worker thread.
pub struct PersistenceScheduler {
    shared: Arc<SchedulerShared>,
    worker: Option<JoinHandle<()>>,
}

impl PersistenceScheduler {
    /// Start the persistence worker for `store`.
    ///
    /// The store's current generation is assumed to match the file on disk
    /// (it was just loaded from it), so the first periodic tick does not
    /// rewrite an unchanged snapshot.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Io` if the worker thread cannot be spawned.
    pub fn spawn(
        store: Arc<GuardedStore>,
        path: impl Into<PathBuf>,
        errors: Arc<ErrorSink>,
        autosave_interval: Duration,
    ) -> Result<Self> {
        let persisted = Some(store.generation());
        let shared = Arc::new(SchedulerShared {
            store,
            path: path.into(),
            errors,
            autosave_interval,
            control: Mutex::new(Control::default()),
            wake: Condvar::new(),
            write_state: Mutex::new(WriteState { persisted }),
            closed: RwLock::new(false),
            requests: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        });

        let for_worker = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("atask-persistence".to_string())
            .spawn(move || for_worker.run())?;

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    pub fn handle(&self) -> SaveHandle {
        SaveHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    pub fn request_save(&self) {
        self.shared.request();
    }

    /// Write the current snapshot on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::PersistenceUnavailable` if the write fails, or
    /// `TaskError::SerializationError` if the capture fails.
    pub fn save_now(&self) -> Result<SaveOutcome> {
        self.shared.save(true)
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    pub fn stats(&self) -> SaveStats {
        SaveStats {
            requests: self.shared.requests.load(Ordering::Relaxed),
            writes: self.shared.writes.load(Ordering::Relaxed),
            skipped: self.shared.skipped.load(Ordering::Relaxed),
            failures: self.shared.failures.load(Ordering::Relaxed),
        }
    }

    /// Stop the worker and then perform one final synchronous save, so the
    /// most recent mutation is on disk when this returns `Ok`.
    ///
    /// Waits for admitted mutations to finish; later ones are refused.
    ///
    /// # Errors
    ///
    /// Returns the final save's error; it is also recorded in the error
    /// channel.
    pub fn shutdown(&mut self) -> Result<SaveOutcome> {
        *self.shared.closed.write() = true;
        self.join_worker();
        self.shared.save(true).inspect_err(|err| {
            self.shared.errors.record(COMPONENT, err);
        })
    }

    fn join_worker(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.shared.control.lock().stopping = true;
        self.shared.wake.notify_all();
        if worker.join().is_err() {
            log::error!("persistence worker panicked");
        }
    }
}

impl Drop for PersistenceScheduler {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.shutdown();
        }
    }
}
