//! Batched audit log: an in-memory queue fed by any thread and a
//! background flusher that appends it to the log file.
//!
//! # Modules
//!
//! - [`entry`] — `LogEntry` and the one-line text format.
//! - [`buffer`] — the lock-guarded queue.
//! - [`flusher`] — the periodic drain worker and its final drain.
//! - [`error_sink`] — side channel for background infrastructure failures.

pub mod buffer;
pub mod entry;
pub mod error_sink;
pub mod flusher;

pub use buffer::LogBuffer;
pub use entry::{LogEntry, LogLevel};
pub use error_sink::ErrorSink;
pub use flusher::{FlushStats, LogFlusher};
