//! The account map and the single lock that guards it.
//!
//! Every read-modify-write on an account runs inside one critical section
//! (`create`, `mutate`). Snapshots are serialized while the lock is held so
//! a snapshot never contains a half-applied mutation; writing the bytes to
//! disk happens later, off the lock.

use parking_lot::Mutex;

use crate::account::{AccountMap, AccountRecord};
use crate::error::{Result, TaskError};

/// Point-in-time serialized copy of the whole account map.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    /// Store generation at capture time.
    pub generation: u64,
    /// Number of accounts captured.
    pub account_count: usize,
    /// Pretty-printed JSON document.
    pub document: Vec<u8>,
}

struct StoreState {
    accounts: AccountMap,
    /// Bumped by every successful mutation.
    generation: u64,
}

/// In-memory account map behind one mutex.
pub struct GuardedStore {
    state: Mutex<StoreState>,
}

impl Default for GuardedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GuardedStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::from_accounts(AccountMap::new())
    }

    /// Create a store pre-populated from a loaded snapshot.
    pub fn from_accounts(mut accounts: AccountMap) -> Self {
        for (identifier, record) in accounts.iter_mut() {
            record.bind_identifier(identifier);
        }
        Self {
            state: Mutex::new(StoreState {
                accounts,
                generation: 0,
            }),
        }
    }

    /// Return a copy of the account, if present.
    pub fn get(&self, identifier: &str) -> Option<AccountRecord> {
        self.state.lock().accounts.get(identifier).cloned()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.state.lock().accounts.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.state.lock().accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().accounts.is_empty()
    }

    /// All identifiers in sorted order.
    pub fn identifiers(&self) -> Vec<String> {
        self.state.lock().accounts.keys().cloned().collect()
    }

    /// Current mutation generation.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Register a new account. The existence check and the insert share
    /// one critical section.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::AlreadyExists` if the identifier is taken; the
    /// existing record is left untouched.
    pub fn create(&self, identifier: &str, credential: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.accounts.contains_key(identifier) {
            return Err(TaskError::AlreadyExists(identifier.to_string()));
        }
        state.accounts.insert(
            identifier.to_string(),
            AccountRecord::new(identifier, credential),
        );
        state.generation += 1;
        Ok(())
    }

    /// Opaque credential lookup. Absent accounts never match.
    pub fn verify_credential(&self, identifier: &str, credential: &str) -> bool {
        self.state
            .lock()
            .accounts
            .get(identifier)
            .is_some_and(|record| record.credential_matches(credential))
    }

    /// Apply `f` to the account while holding exclusive access.
    ///
    /// The generation advances only when `f` succeeds; a failing `f` must
    /// leave the record as it found it.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::NotFound` if the account does not exist, or
    /// whatever `f` returns.
    pub fn mutate<R>(
        &self,
        identifier: &str,
        f: impl FnOnce(&mut AccountRecord) -> Result<R>,
    ) -> Result<R> {
        let mut state = self.state.lock();
        let record = state
            .accounts
            .get_mut(identifier)
            .ok_or_else(|| TaskError::NotFound(identifier.to_string()))?;
        let out = f(record)?;
        state.generation += 1;
        Ok(out)
    }

    /// Serialize the whole map under the lock.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::SerializationError` if JSON encoding fails.
    pub fn snapshot(&self) -> Result<StoreSnapshot> {
        let state = self.state.lock();
        let document = serde_json::to_vec_pretty(&state.accounts)
            .map_err(|e| TaskError::SerializationError(e.to_string()))?;
        Ok(StoreSnapshot {
            generation: state.generation,
            account_count: state.accounts.len(),
            document,
        })
    }
}
