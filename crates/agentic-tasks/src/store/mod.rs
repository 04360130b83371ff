//! In-memory account store.

pub mod guarded;

pub use guarded::{GuardedStore, StoreSnapshot};
