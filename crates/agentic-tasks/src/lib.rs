//! AgenticTasks — crash-tolerant task store for agents.
//!
//! Provides a lock-guarded in-memory account store with ordered task
//! lists, debounced atomic snapshots to disk with a periodic safety-net
//! save, and a batched audit log drained by a background flusher. A
//! [`Vault`] owns the shared state and runs the orderly shutdown.

pub mod account;
pub mod audit;
pub mod config;
pub mod error;
pub mod persistence;
pub mod session;
pub mod store;
pub mod time;
pub mod vault;

// Re-export primary types
pub use account::{AccountMap, AccountRecord, TaskRecord};
pub use config::VaultConfig;
pub use error::{Result, TaskError};
pub use session::{render_tasks, AccountSession, SessionState};
pub use store::{GuardedStore, StoreSnapshot};
pub use vault::{ShutdownReport, Vault};

// Re-export worker types
pub use audit::{ErrorSink, FlushStats, LogBuffer, LogEntry, LogFlusher, LogLevel};
pub use persistence::{
    load_snapshot, PersistenceScheduler, SaveHandle, SaveOutcome, SavePermit, SaveStats,
    SnapshotSource,
};
