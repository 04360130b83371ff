//! Snapshot persistence: the on-disk file and the worker that writes it.
//!
//! # Modules
//!
//! - [`snapshot_file`] — load at startup, atomic temp-file-then-rename save.
//! - [`scheduler`] — debounced background writer with periodic autosave.

pub mod scheduler;
pub mod snapshot_file;

pub use scheduler::{PersistenceScheduler, SaveHandle, SaveOutcome, SavePermit, SaveStats};
pub use snapshot_file::{load_snapshot, write_snapshot, LoadedSnapshot, SnapshotSource};
