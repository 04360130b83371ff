//! Background drain of the audit buffer into the log file.
//!
//! One worker thread wakes every `interval`, swaps the buffer out and
//! appends the formatted lines in arrival order. `flush_now` and the
//! final drain in `stop` share a write lock with the worker, so at most
//! one writer touches the log file at a time.
//!
//! Lines are written one at a time. A failed write puts the entries that
//! did not reach the file back at the front of the buffer and reports the
//! failure to the [`ErrorSink`]; the next cycle retries them. Lines already
//! written are never written again.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use super::buffer::LogBuffer;
use super::entry::LogEntry;
use super::error_sink::ErrorSink;
use crate::error::{Result, TaskError};

const COMPONENT: &str = "log-flusher";

/// Counters exposed for monitoring and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Drains that wrote at least one line.
    pub flushes: u64,
    pub lines_written: u64,
    pub failures: u64,
}

struct FlusherShared {
    buffer: Arc<LogBuffer>,
    path: PathBuf,
    errors: Arc<ErrorSink>,
    interval: Duration,
    stopping: Mutex<bool>,
    wake: Condvar,
    write_lock: Mutex<()>,
    flushes: AtomicU64,
    lines_written: AtomicU64,
    failures: AtomicU64,
}

impl FlusherShared {
    /// Drain the buffer once and append it to the log file.
    fn flush_once(&self) -> Result<usize> {
        let _writer = self.write_lock.lock();
        let entries = self.buffer.drain();
        if entries.is_empty() {
            return Ok(0);
        }

        let result = append_entries(&self.path, &entries);
        self.settle(entries, result)
    }

    /// Account for a batch write: count what landed, requeue the rest.
    fn settle(
        &self,
        mut entries: Vec<LogEntry>,
        result: WriteResult,
    ) -> Result<usize> {
        match result {
            Ok(()) => {
                let n = entries.len();
                self.flushes.fetch_add(1, Ordering::Relaxed);
                self.lines_written.fetch_add(n as u64, Ordering::Relaxed);
                log::debug!("flushed {n} audit lines to {}", self.path.display());
                Ok(n)
            }
            Err(PartialWrite { written, error }) => {
                let unwritten = entries.split_off(written.min(entries.len()));
                self.buffer.requeue_front(unwritten);
                self.lines_written.fetch_add(written as u64, Ordering::Relaxed);
                self.failures.fetch_add(1, Ordering::Relaxed);
                Err(TaskError::LogUnavailable(format!(
                    "{} ({written} lines written): {error}",
                    self.path.display()
                )))
            }
        }
    }

    fn run(&self) {
        loop {
            {
                let mut stopping = self.stopping.lock();
                if !*stopping {
                    self.wake.wait_for(&mut stopping, self.interval);
                }
                if *stopping {
                    break;
                }
            }
            if let Err(err) = self.flush_once() {
                self.errors.record(COMPONENT, &err);
            }
        }
        log::debug!("log flusher worker exited");
    }
}

/// Owns the log flush worker thread.
pub struct LogFlusher {
    shared: Arc<FlusherShared>,
    worker: Option<JoinHandle<()>>,
}

impl LogFlusher {
    /// Start the flush worker.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Io` if the worker thread cannot be spawned.
    pub fn spawn(
        buffer: Arc<LogBuffer>,
        path: impl Into<PathBuf>,
        errors: Arc<ErrorSink>,
        interval: Duration,
    ) -> Result<Self> {
        let shared = Arc::new(FlusherShared {
            buffer,
            path: path.into(),
            errors,
            interval,
            stopping: Mutex::new(false),
            wake: Condvar::new(),
            write_lock: Mutex::new(()),
            flushes: AtomicU64::new(0),
            lines_written: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        });

        let for_worker = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("atask-log-flusher".to_string())
            .spawn(move || for_worker.run())?;

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Synchronously drain whatever is buffered right now.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::LogUnavailable` if the log file cannot be
    /// written; the entries stay buffered.
    pub fn flush_now(&self) -> Result<usize> {
        self.shared.flush_once()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    pub fn stats(&self) -> FlushStats {
        FlushStats {
            flushes: self.shared.flushes.load(Ordering::Relaxed),
            lines_written: self.shared.lines_written.load(Ordering::Relaxed),
            failures: self.shared.failures.load(Ordering::Relaxed),
        }
    }

    /// Stop the worker, then drain exactly what is buffered at that point.
    ///
    /// Calling `stop` again only repeats the final drain.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::LogUnavailable` if the final drain fails. The
    /// failure is also recorded in the error channel.
    pub fn stop(&mut self) -> Result<usize> {
        self.join_worker();
        self.shared.flush_once().inspect_err(|err| {
            self.shared.errors.record(COMPONENT, err);
        })
    }

    fn join_worker(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        *self.shared.stopping.lock() = true;
        self.shared.wake.notify_all();
        if worker.join().is_err() {
            log::error!("log flusher worker panicked");
        }
    }
}

impl Drop for LogFlusher {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.stop();
        }
    }
}

/// A write that stopped after `written` complete lines.
#[derive(Debug)]
struct PartialWrite {
    written: usize,
    error: io::Error,
}

type WriteResult = std::result::Result<(), PartialWrite>;

fn append_entries(path: &Path, entries: &[LogEntry]) -> WriteResult {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|error| PartialWrite { written: 0, error })?;
    write_lines(&mut file, entries)
}

/// Write one line per entry, stopping at the first failure.
fn write_lines<W: Write>(out: &mut W, entries: &[LogEntry]) -> WriteResult {
    for (written, entry) in entries.iter().enumerate() {
        let mut line = entry.format_line();
        line.push('\n');
        out.write_all(line.as_bytes()).map_err(|error| PartialWrite { written, error })?;
    }
    out.flush().map_err(|error| PartialWrite {
        written: entries.len(),
        error,
    })
}
